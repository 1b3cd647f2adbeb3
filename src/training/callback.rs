/// Progress hook invoked after every epoch
///
/// Receives the epoch index and a snapshot of the head embedding (flat,
/// row-major). The optimiser waits for the call to return before the next
/// epoch starts; implementations that want to do heavy work should hand the
/// snapshot off to another thread.
pub trait EpochCallback<T>: Send + Sync {
    /// Called once the epoch `epoch` is fully applied
    fn on_epoch_end(&self, epoch: usize, embedding: &[T]);
}

impl<T, F> EpochCallback<T> for F
where
    F: Fn(usize, &[T]) + Send + Sync,
{
    fn on_epoch_end(&self, epoch: usize, embedding: &[T]) {
        self(epoch, embedding)
    }
}

#[cfg(test)]
mod test_callback {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_closure_as_callback() {
        let seen = Mutex::new(Vec::new());
        let cb = |epoch: usize, embd: &[f64]| seen.lock().unwrap().push((epoch, embd.len()));

        EpochCallback::<f64>::on_epoch_end(&cb, 0, &[0.0, 1.0]);
        EpochCallback::<f64>::on_epoch_end(&cb, 1, &[0.0, 1.0]);

        assert_eq!(*seen.lock().unwrap(), vec![(0, 2), (1, 2)]);
    }
}
