use std::io::Write;
use std::sync::{Arc, Mutex};

// Terminal progress bar shared by the render workers. Callers report work
// units as they finish; reprinting is throttled so the bar does not become
// the bottleneck.
pub struct Progress {
    total_work: u64,
    completed: u64,
    output: Arc<Mutex<dyn Write + Send + Sync>>,
    bar_length: u32,
    last_printed_fraction: f32,
}

const REPRINT_DELTA: f32 = 0.009_f32;

const BAR_PREFIX: &str = "\rTracing: [";
const FILLED_CHAR: char = '=';
const EMPTY_CHAR: char = ' ';

impl Progress {
    pub fn new(
        total_work: u64,
        output: Arc<Mutex<dyn Write + Send + Sync>>,
        bar_length: u32,
    ) -> Progress {
        Progress {
            total_work: total_work,
            completed: 0_u64,
            output: output,
            bar_length: bar_length,
            last_printed_fraction: 0.0_f32,
        }
    }

    pub fn update(&mut self, work_done: u64) {
        self.completed = std::cmp::min(self.completed + work_done, self.total_work);
        let fraction = (self.completed as f64 / self.total_work as f64) as f32;
        if (fraction - self.last_printed_fraction).abs() > REPRINT_DELTA {
            self.print_bar(fraction);
        }
    }

    pub fn done(&mut self) {
        self.print_bar(1.0_f32);
        let mut out = match self.output.lock() {
            Ok(guard) => guard,
            Err(_) => return,
        };
        let _ = out.write("\n".as_bytes());
        let _ = out.flush();
    }

    fn print_bar(&mut self, fraction: f32) {
        self.last_printed_fraction = fraction;

        let filled = (fraction * self.bar_length as f32).round() as u32;
        let mut bar =
            String::with_capacity(BAR_PREFIX.len() + self.bar_length as usize + 8_usize);
        bar.push_str(BAR_PREFIX);
        for _ in 0..filled {
            bar.push(FILLED_CHAR);
        }
        for _ in 0..(self.bar_length - filled) {
            bar.push(EMPTY_CHAR);
        }
        bar.push_str(format!("] {}%", (fraction * 100.0_f32).round() as u32).as_str());

        let mut out = match self.output.lock() {
            Ok(guard) => guard,
            Err(_) => return,
        };
        let _ = out.write(bar.as_bytes());
        let _ = out.flush();
    }
}
