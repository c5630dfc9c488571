//! 单写者状态容器
//!
//! 基于 `tokio::sync::watch`：写入方通过 `set`/`update` 替换快照，
//! 读取方拿到不可变的 `Arc<T>` 快照，并可通过 `subscribe` 等待变更通知。

use std::{fmt, sync::Arc};

use tokio::sync::watch;

pub struct Store<T> {
    tx: watch::Sender<Arc<T>>,
}

impl<T> Store<T> {
    pub fn new(initial: T) -> Self {
        let (tx, _rx) = watch::channel(Arc::new(initial));
        Self { tx }
    }

    /// 当前快照
    pub fn get(&self) -> Arc<T> {
        self.tx.borrow().clone()
    }

    /// 订阅变更；接收端创建时的值视为已读
    pub fn subscribe(&self) -> watch::Receiver<Arc<T>> {
        self.tx.subscribe()
    }

    pub fn set(&self, value: T) {
        self.tx.send_replace(Arc::new(value));
    }

    /// 基于当前快照计算新值
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        self.tx.send_modify(|current| {
            let next = f(current);
            *current = Arc::new(next);
        });
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl<T: Default> Default for Store<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for Store<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Store").field(&*self.tx.borrow()).finish()
    }
}
