// Copyright 2026 sunder
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::{future::Future, sync::Arc};

use tokio::{
    sync::Semaphore,
    task::{JoinError, JoinSet},
};

/// Bounds how many admitted tasks run at once.
///
/// Admission suspends until a slot frees up rather than polling; the permit
/// rides inside the spawned task and frees on completion.
pub struct Throttle<T> {
    permits: Arc<Semaphore>,
    tasks: JoinSet<T>,
}

impl<T: Send + 'static> Throttle<T> {
    pub fn new(max_in_flight: usize) -> Self {
        debug_assert!(max_in_flight > 0);
        Throttle {
            permits: Arc::new(Semaphore::new(max_in_flight)),
            tasks: JoinSet::new(),
        }
    }

    /// Wait for a free slot, then spawn the task into the pool.
    pub async fn admit<F>(&mut self, task: F)
    where
        F: Future<Output = T> + Send + 'static,
    {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .expect("throttle semaphore is never closed");
        self.tasks.spawn(async move {
            let _permit = permit;
            task.await
        });
    }

    /// Next completed task, in completion order. `None` once the pool is
    /// drained.
    pub async fn join_next(&mut self) -> Option<Result<T, JoinError>> {
        self.tasks.join_next().await
    }

    /// Admitted tasks not yet joined, including already completed ones.
    pub fn in_flight(&self) -> usize { self.tasks.len() }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn caps_tasks_in_flight() {
        const CAP: usize = 5;
        const TASKS: usize = 64;

        let running = Arc::new(AtomicUsize::new(0));
        let high_water = Arc::new(AtomicUsize::new(0));

        let mut throttle = Throttle::new(CAP);
        for _ in 0..TASKS {
            let running = running.clone();
            let high_water = high_water.clone();
            throttle
                .admit(async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    high_water.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(2)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                })
                .await;
        }

        let mut joined = 0;
        while let Some(res) = throttle.join_next().await {
            res.unwrap();
            joined += 1;
        }

        assert_eq!(joined, TASKS);
        assert!(high_water.load(Ordering::SeqCst) <= CAP);
        assert!(high_water.load(Ordering::SeqCst) > 1);
    }

    #[tokio::test]
    async fn drains_to_none() {
        let mut throttle: Throttle<u32> = Throttle::new(2);
        throttle.admit(async { 7 }).await;
        assert_eq!(throttle.in_flight(), 1);

        assert_eq!(throttle.join_next().await.unwrap().unwrap(), 7);
        assert!(throttle.join_next().await.is_none());
        assert_eq!(throttle.in_flight(), 0);
    }
}
