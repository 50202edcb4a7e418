#[allow(dead_code)]
pub mod raw_image_server;
pub mod socket_guard;
