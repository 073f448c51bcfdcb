use indicatif::{ProgressBar, ProgressStyle};

const TICKS: u64 = 1000;

/// Progress display for the event loop.
///
/// Only observes; never draws from the simulation RNG.
pub(crate) struct Progress {
    bar: Option<ProgressBar>,
    start: f64,
    duration: f64,
}

impl Progress {
    pub(crate) fn new(verbose: bool, start: f64, duration: f64) -> Self {
        let bar = verbose.then(|| {
            let pb = ProgressBar::new(TICKS);
            let style = ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-");
            pb.set_style(style);
            pb
        });
        Self {
            bar,
            start,
            duration,
        }
    }

    pub(crate) fn update(&self, time: f64, active: usize) {
        let Some(pb) = &self.bar else {
            return;
        };
        if self.duration > 0.0 {
            let fraction = ((time - self.start) / self.duration).clamp(0.0, 1.0);
            pb.set_position((fraction * TICKS as f64) as u64);
        }
        pb.set_message(format!("t={time:.3}, n={active}"));
    }

    pub(crate) fn finish(&self) {
        if let Some(pb) = &self.bar {
            pb.finish();
        }
    }

    pub(crate) fn abandon(&self) {
        if let Some(pb) = &self.bar {
            pb.abandon_with_message("aborted");
        }
    }
}
