//! Per-format [`ParseToArticle`](crate::ParseToArticle) implementations.

pub(crate) mod feed;
pub(crate) mod html;
pub(crate) mod json_api;
