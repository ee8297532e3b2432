mod account;
mod auth;
mod images;
mod meta;

pub use account::{
    get_api_key, link_status, link_telegram, rotate_api_key, unlink_telegram, user_uploads,
};
pub use auth::{login, logout, register};
pub use images::{delete_image, info, serve_media, upload};
pub use meta::{health, index, stats};
