use std::collections::VecDeque;
use std::io;
use std::sync::{Mutex, MutexGuard};

use crate::infra::contracts::ChatTerminal;

static ENV_LOCK: Mutex<()> = Mutex::new(());

pub fn env_lock() -> MutexGuard<'static, ()> {
    ENV_LOCK.lock().expect("env lock should not be poisoned")
}

/// Scripted [`ChatTerminal`]: pops canned inputs, records printed lines.
pub struct FakeTerminal {
    inputs: VecDeque<Option<String>>,
    pub output: Vec<String>,
}

impl FakeTerminal {
    pub fn new(inputs: Vec<Option<&str>>) -> Self {
        Self {
            inputs: inputs
                .into_iter()
                .map(|item| item.map(|value| value.to_owned()))
                .collect(),
            output: Vec::new(),
        }
    }

    pub fn printed(&self, needle: &str) -> bool {
        self.output.iter().any(|line| line.contains(needle))
    }
}

impl ChatTerminal for FakeTerminal {
    fn print_line(&mut self, line: &str) -> io::Result<()> {
        self.output.push(line.to_owned());
        Ok(())
    }

    fn prompt_line(&mut self, _prompt: &str) -> io::Result<Option<String>> {
        Ok(self.inputs.pop_front().flatten())
    }

    fn prompt_secret(&mut self, _prompt: &str) -> io::Result<Option<String>> {
        Ok(self.inputs.pop_front().flatten())
    }
}
