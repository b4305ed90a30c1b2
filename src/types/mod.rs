//! 类型系统模块：定义缓存、驱动和网关共享的负载类型。
//!
//! Core data types shared by the cache, the model drivers and the gateway.

pub mod payload;

pub use payload::{
    is_utf8_text, with_utf8_charset, Payload, PayloadKind, DEFAULT_BINARY_CONTENT_TYPE,
    TEXT_CONTENT_TYPE,
};
