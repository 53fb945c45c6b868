//! Smooth Unicode progress bar widget.

use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::theme::{C_ACCENT, C_SECONDARY};

const BLOCKS: [char; 9] = [' ', '▏', '▎', '▍', '▌', '▋', '▊', '▉', '█'];

/// Render `pos / dur` as a bar followed by `mm:ss / mm:ss`. An unknown or
/// zero duration draws an empty track and `--:--`.
pub fn draw_progress(frame: &mut Frame, area: Rect, pos: f64, dur: f64) {
    if area.width < 4 || area.height == 0 {
        return;
    }
    let label = if dur > 0.0 {
        format!(" {} / {}", format_time(pos), format_time(dur))
    } else {
        " 00:00 / --:--".to_string()
    };
    let bar_w = (area.width as usize).saturating_sub(label.chars().count()).max(4);
    let progress = if dur > 0.0 { (pos / dur).clamp(0.0, 1.0) } else { 0.0 };

    let line = Line::from(vec![
        Span::styled(smooth_bar(progress, bar_w), Style::default().fg(C_ACCENT)),
        Span::styled(label, Style::default().fg(C_SECONDARY)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

/// `progress` in 0.0..=1.0, eight steps per cell, `─` for the empty track.
pub fn smooth_bar(progress: f64, width: usize) -> String {
    let eighths = (progress.clamp(0.0, 1.0) * width as f64 * 8.0) as usize;
    let full = eighths / 8;
    let partial = eighths % 8;
    let mut bar = String::with_capacity(width * 3);
    for _ in 0..full.min(width) {
        bar.push('█');
    }
    if full < width {
        bar.push(if partial > 0 { BLOCKS[partial] } else { '─' });
        for _ in (full + 1)..width {
            bar.push('─');
        }
    }
    bar
}

/// `mm:ss`, or `hh:mm:ss` past the hour.
pub fn format_time(secs: f64) -> String {
    let total = if secs.is_finite() { secs.max(0.0) as u64 } else { 0 };
    let h = total / 3600;
    let m = (total % 3600) / 60;
    let s = total % 60;
    if h > 0 {
        format!("{:02}:{:02}:{:02}", h, m, s)
    } else {
        format!("{:02}:{:02}", m, s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_formats() {
        assert_eq!(format_time(0.0), "00:00");
        assert_eq!(format_time(75.9), "01:15");
        assert_eq!(format_time(3725.0), "01:02:05");
        assert_eq!(format_time(-4.0), "00:00");
        assert_eq!(format_time(f64::NAN), "00:00");
    }

    #[test]
    fn bar_has_requested_width() {
        for p in [0.0, 0.33, 0.5, 1.0] {
            assert_eq!(smooth_bar(p, 20).chars().count(), 20);
        }
        assert_eq!(smooth_bar(1.0, 4), "████");
    }
}
