use std::future::Future;

use log::debug;
use tokio::{sync::Mutex, task::JoinHandle, time::{sleep, Duration}};

/// Runs delayed tasks and aborts whatever is still pending when dropped.
pub struct Scheduler {
    tasks: Mutex<Vec<JoinHandle<()>>>
}

impl Scheduler {
    pub fn new() -> Self {
        Scheduler { tasks: Mutex::new(Vec::new()) }
    }

    pub async fn schedule<F>(&self, delay: Duration, task: F)
    where
        F: Future<Output = ()> + Send + 'static
    {
        let handle = tokio::spawn(async move {
            sleep(delay).await;
            task.await;
        });

        let mut tasks = self.tasks.lock().await;
        tasks.retain(|h| !h.is_finished());
        tasks.push(handle);
    }

    #[cfg(test)]
    pub async fn pending(&self) -> usize {
        self.tasks.lock().await
            .iter()
            .filter(|h| !h.is_finished())
            .count()
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        let tasks = self.tasks.get_mut();
        let pending = tasks.iter().filter(|h| !h.is_finished()).count();
        if pending > 0 {
            debug!("Cancelling {} pending task(s)", pending);
        }
        for handle in tasks.drain(..) {
            handle.abort();
        }
    }
}
