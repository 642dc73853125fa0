use parking_lot::{Condvar, Mutex};

/// Counting semaphore for the worker idle barrier. Workers that are not
/// elected to advance the level block here until the next distribution
/// or a stop signal releases them.
#[derive(Debug)]
pub(crate) struct Semaphore {
    permits: Mutex<usize>,
    available: Condvar,
}

impl Semaphore {
    pub fn new(permits: usize) -> Self {
        Self {
            permits: Mutex::new(permits),
            available: Condvar::new(),
        }
    }

    pub fn acquire(&self) {
        let mut permits = self.permits.lock();
        while *permits == 0 {
            self.available.wait(&mut permits);
        }
        *permits -= 1;
    }

    pub fn release(&self, n: usize) {
        if n == 0 {
            return;
        }
        let mut permits = self.permits.lock();
        *permits += n;
        if n == 1 {
            self.available.notify_one();
        } else {
            self.available.notify_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_release_unblocks_acquire() {
        let sem = Arc::new(Semaphore::new(0));
        let handles: Vec<_> = (0..3)
            .map(|_| {
                let sem = sem.clone();
                std::thread::spawn(move || sem.acquire())
            })
            .collect();

        sem.release(3);
        for handle in handles {
            handle.join().unwrap();
        }
    }

    #[test]
    fn test_acquire_consumes_permit() {
        let sem = Semaphore::new(2);
        sem.acquire();
        sem.acquire();
        assert_eq!(*sem.permits.lock(), 0);
    }
}
