use std::path::Path;

use directories::BaseDirs;
use ratatui::{buffer::Buffer, layout::Rect, style::Color};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

pub fn fill_bg(buf: &mut Buffer, area: Rect, color: Color) {
    for x in area.left()..area.right() {
        for y in area.top()..area.bottom() {
            buf[(x, y)].set_bg(color);
        }
    }
}

pub fn pad<S: AsRef<str>>(s: S, pad: usize) -> String {
    let s = s.as_ref();
    let mut out = String::with_capacity(s.len() + pad * 2);
    for _ in 0..pad {
        out.push(' ');
    }
    out.push_str(s);
    for _ in 0..pad {
        out.push(' ');
    }
    out
}

/// Cut `s` to at most `width` terminal columns, marking the cut with `…`.
pub fn truncate(s: &str, width: usize) -> String {
    if s.width() <= width {
        return s.to_string();
    }
    if width == 0 {
        return String::new();
    }
    let mut out = String::new();
    let mut used = 0;
    for ch in s.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w + 1 > width {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push('…');
    out
}

pub fn abbreviate_home(path: &Path) -> String {
    let Some(base_dirs) = BaseDirs::new() else {
        return path.display().to_string();
    };
    let home = base_dirs.home_dir();
    if let Ok(rest) = path.strip_prefix(home) {
        if rest.as_os_str().is_empty() {
            "~".to_string()
        } else {
            format!("~/{}", rest.display())
        }
    } else {
        path.display().to_string()
    }
}
