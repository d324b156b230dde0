use parking_lot::Mutex;
use ringbuf::{traits::*, HeapRb};
use std::sync::Arc;

/// Sliding window over the most recent samples of a stream.
///
/// Cloning shares the window, so an audio callback can push while the
/// owning adapter reads snapshots for spectrum analysis.
pub struct SampleWindow {
    buffer: Arc<Mutex<HeapRb<f32>>>,
}

impl SampleWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: Arc::new(Mutex::new(HeapRb::new(capacity.max(1)))),
        }
    }

    /// Append samples, evicting the oldest ones once full
    pub fn push(&self, samples: &[f32]) {
        let mut buffer = self.buffer.lock();
        for &sample in samples {
            if buffer.is_full() {
                let _ = buffer.try_pop();
            }
            let _ = buffer.try_push(sample);
        }
    }

    pub fn push_pcm16(&self, samples: &[i16]) {
        let converted: Vec<f32> = samples
            .iter()
            .map(|&s| s as f32 / i16::MAX as f32)
            .collect();
        self.push(&converted);
    }

    /// Copy of the window contents, oldest first
    pub fn snapshot(&self) -> Vec<f32> {
        self.buffer.lock().iter().copied().collect()
    }

    pub fn clear(&self) {
        self.buffer.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.buffer.lock().occupied_len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.buffer.lock().capacity().get()
    }
}

impl Clone for SampleWindow {
    fn clone(&self) -> Self {
        Self {
            buffer: Arc::clone(&self.buffer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_keeps_latest_samples() {
        let window = SampleWindow::new(4);
        window.push(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(window.snapshot(), vec![3.0, 4.0, 5.0, 6.0]);
        assert_eq!(window.len(), 4);
        assert_eq!(window.capacity(), 4);
    }

    #[test]
    fn test_clones_share_storage() {
        let window = SampleWindow::new(8);
        let writer = window.clone();
        writer.push_pcm16(&[i16::MAX, 0]);

        let snapshot = window.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert!((snapshot[0] - 1.0).abs() < f32::EPSILON);

        window.clear();
        assert!(writer.is_empty());
    }
}
