//! HTTP 处理器模块
//! 请求分发层：解析参数、调用服务、组装结果信封

pub mod account;
pub mod audit;
pub mod export;
pub mod health;
pub mod statistics;
