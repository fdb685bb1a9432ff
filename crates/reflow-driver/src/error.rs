//! 驱动层错误类型定义

use reflow_link::LinkError;
use reflow_protocol::ProtocolError;
use thiserror::Error;

/// 驱动层错误类型
#[derive(Error, Debug)]
pub enum DriverError {
    /// 串口链路错误（打开失败、写入失败等）
    #[error("Link error: {0}")]
    Link(#[from] LinkError),

    /// 协议错误
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// 读取线程因链路断开而退出
    #[error("Serial stream lost: {0}")]
    StreamLost(#[source] LinkError),

    /// 读取线程已经启动过
    #[error("Reader already started")]
    AlreadyStarted,

    /// 启动前已经请求停止
    #[error("Reader was stopped before it started")]
    StoppedBeforeStart,

    /// 读取线程 panic
    #[error("Reader thread panicked")]
    ReaderPanicked,

    /// IO 线程错误（如线程创建失败）
    #[error("IO thread error: {0}")]
    IoThread(String),
}

/// 订阅者回调错误
///
/// 只影响出错的订阅者本身：不会阻止其他订阅者收到同一条报文，
/// 也不会让读取线程退出。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandlerError {
    /// 回调返回的业务错误
    #[error("Subscriber handler failed: {0}")]
    Failed(String),

    /// 回调 panic（已被捕获）
    #[error("Subscriber handler panicked: {0}")]
    Panicked(String),

    /// 订阅者队列已满，报文被丢弃
    #[error("Subscriber queue full")]
    QueueFull,

    /// 订阅者的接收端已关闭
    #[error("Subscriber disconnected")]
    Disconnected,
}

impl HandlerError {
    /// 构造业务错误
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}
