// cvar.rs - tunable console variables

use log::warn;
use std::collections::HashMap;

pub const CVAR_ARCHIVE: i32 = 1; // saved to the host's config

/// A console variable.
#[derive(Debug, Clone)]
pub struct Cvar {
    pub name: String,
    pub string: String,
    pub flags: i32,
    pub value: f32,
}

/// Owns every cvar registered by the module.
#[derive(Debug, Default)]
pub struct CvarContext {
    pub cvar_vars: Vec<Cvar>,
    /// O(1) cvar lookup by name -> index in cvar_vars
    cvar_index: HashMap<String, usize>,
}

fn parse_value(s: &str) -> f32 {
    s.trim().parse::<f32>().unwrap_or(0.0)
}

impl CvarContext {
    pub fn new() -> Self {
        Self::default()
    }

    fn valid_name(name: &str) -> bool {
        !name.is_empty() && !name.contains(['\\', '"', ';', ' '])
    }

    pub fn find_var_index(&self, name: &str) -> Option<usize> {
        self.cvar_index.get(name).copied()
    }

    pub fn find_var(&self, name: &str) -> Option<&Cvar> {
        self.cvar_index.get(name).map(|&idx| &self.cvar_vars[idx])
    }

    /// Get the floating-point value of a cvar. Returns 0 if not found.
    pub fn variable_value(&self, name: &str) -> f32 {
        self.find_var(name).map_or(0.0, |var| var.value)
    }

    /// Get or create a cvar. An existing cvar keeps its value; flags are
    /// OR'd in.
    pub fn get(&mut self, name: &str, value: &str, flags: i32) -> Option<usize> {
        if !Self::valid_name(name) {
            warn!("invalid cvar name \"{}\"", name);
            return None;
        }

        if let Some(&idx) = self.cvar_index.get(name) {
            self.cvar_vars[idx].flags |= flags;
            return Some(idx);
        }

        let idx = self.cvar_vars.len();
        self.cvar_vars.push(Cvar {
            name: name.to_string(),
            string: value.to_string(),
            flags,
            value: parse_value(value),
        });
        self.cvar_index.insert(name.to_string(), idx);

        Some(idx)
    }

    /// Set a cvar value, creating it if unknown.
    pub fn set(&mut self, name: &str, value: &str) -> Option<usize> {
        let idx = match self.find_var_index(name) {
            Some(idx) => idx,
            None => return self.get(name, value, 0),
        };

        let var = &mut self.cvar_vars[idx];
        if value != var.string {
            var.string = value.to_string();
            var.value = parse_value(value);
        }

        Some(idx)
    }
}
