//! Text rendering of the amplitude window.

const LEVELS: [char; 9] = [' ', '▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// One column per amplitude, oldest on the left, padded to `width`.
pub fn render(amplitudes: &[f32], width: usize) -> String {
    let tail = &amplitudes[amplitudes.len().saturating_sub(width)..];
    let mut bar: String = tail.iter().map(|&a| level(a)).collect();
    bar.extend(std::iter::repeat(' ').take(width - tail.len()));
    bar
}

fn level(amplitude: f32) -> char {
    let clamped = amplitude.clamp(0.0, 1.0);
    let index = (clamped * (LEVELS.len() - 1) as f32).round() as usize;
    LEVELS[index]
}
