//! # Medo Web模块
//!
//! 对外暴露上传和报告两个HTTP接口。

pub mod handlers;
pub mod server;

pub use server::{create_app, AppState, WebServer};
