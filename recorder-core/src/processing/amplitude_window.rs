/// Fixed-size circular window of the most recent amplitude values.
///
/// The controller keeps one on the UI side and drains the amplitude queue
/// into it.
///
/// Overflow behavior: drops the oldest values.
#[derive(Debug, Clone)]
pub struct AmplitudeWindow {
    values: Vec<f32>,
    write_index: usize,
    len: usize,
    capacity: usize,
}

impl AmplitudeWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            values: vec![0.0; capacity],
            write_index: 0,
            len: 0,
            capacity,
        }
    }

    pub fn push(&mut self, amplitude: f32) {
        self.values[self.write_index] = amplitude;
        self.write_index = (self.write_index + 1) % self.capacity;
        self.len = (self.len + 1).min(self.capacity);
    }

    pub fn extend<I: IntoIterator<Item = f32>>(&mut self, amplitudes: I) {
        for amplitude in amplitudes {
            self.push(amplitude);
        }
    }

    /// Values in arrival order, oldest first.
    pub fn snapshot(&self) -> Vec<f32> {
        let start = (self.write_index + self.capacity - self.len) % self.capacity;
        (0..self.len)
            .map(|i| self.values[(start + i) % self.capacity])
            .collect()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.write_index = 0;
        self.len = 0;
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_arrival_order() {
        let mut window = AmplitudeWindow::new(5);
        window.extend([0.1, 0.2, 0.3]);

        assert_eq!(window.len(), 3);
        assert_eq!(window.snapshot(), vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn overflow_drops_oldest() {
        let mut window = AmplitudeWindow::new(3);
        window.extend([0.1, 0.2, 0.3, 0.4, 0.5]);

        assert_eq!(window.len(), 3);
        assert_eq!(window.snapshot(), vec![0.3, 0.4, 0.5]);
    }

    #[test]
    fn fifty_value_tail() {
        let mut window = AmplitudeWindow::new(50);
        window.extend((0..120).map(|i| i as f32));

        let snapshot = window.snapshot();
        assert_eq!(snapshot.len(), 50);
        assert_eq!(snapshot[0], 70.0);
        assert_eq!(snapshot[49], 119.0);
    }

    #[test]
    fn clear_empties() {
        let mut window = AmplitudeWindow::new(4);
        window.extend([0.5, 0.6]);
        window.clear();

        assert!(window.is_empty());
        assert!(window.snapshot().is_empty());

        window.push(0.9);
        assert_eq!(window.snapshot(), vec![0.9]);
    }

    #[test]
    fn zero_capacity_is_bumped_to_one() {
        let mut window = AmplitudeWindow::new(0);
        window.extend([0.1, 0.2]);
        assert_eq!(window.capacity(), 1);
        assert_eq!(window.snapshot(), vec![0.2]);
    }
}
