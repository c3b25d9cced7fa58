pub mod cache;
pub mod config;
pub mod content;
pub mod error;
pub mod events;
pub mod render;
pub mod tasks {
    pub mod autoplay;
    pub mod prefetch;
    pub mod preloader;
    pub mod slider;
    pub mod store;
    pub mod visibility;
}
