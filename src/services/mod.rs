pub mod developer_board;
pub mod discovery_service;
pub mod live_channel;
pub mod location_service;
pub mod search_service;
pub mod socket_io;
