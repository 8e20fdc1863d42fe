pub mod api;
pub mod normalize;
pub mod poller;
