use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

const TEMPLATE: &str = "{msg} [{elapsed_precise}] {bar:40.cyan/blue} {pos:>4}/{len:4} ({eta})";

/// Chapter-level bar on stderr, or a hidden one when `visible` is false.
pub fn chapter_bar(len: usize, message: &'static str, visible: bool) -> ProgressBar {
    let target = if visible {
        ProgressDrawTarget::stderr()
    } else {
        ProgressDrawTarget::hidden()
    };
    let bar = ProgressBar::with_draw_target(Some(len as u64), target);

    let style = ProgressStyle::with_template(TEMPLATE)
        .map(|style| style.progress_chars("##-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    bar.set_style(style);
    bar.set_message(message);
    bar
}
