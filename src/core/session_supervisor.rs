//! 会话监管：后台构建的生命周期
//!
//! 持有会话级 CancellationToken；每次构建拿一个子 token，退出时统一取消所有在途构建。

use tokio_util::sync::CancellationToken;

/// 会话级取消令牌
#[derive(Debug, Default)]
pub struct SessionSupervisor {
    cancel_token: CancellationToken,
}

impl SessionSupervisor {
    pub fn new() -> Self {
        Self {
            cancel_token: CancellationToken::new(),
        }
    }

    /// 取消全部在途构建（会话退出）
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    /// 创建子 token（用于单次构建）
    pub fn child_token(&self) -> CancellationToken {
        self.cancel_token.child_token()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_propagates_to_children() {
        let supervisor = SessionSupervisor::new();
        let child = supervisor.child_token();
        assert!(!child.is_cancelled());
        supervisor.cancel();
        assert!(child.is_cancelled());
    }
}
