//! Fixed-slot typed data model: bounded indices only, no path traversal.

pub type Point = (f64, f64);

/// The data store behind `__form` bindings. Reads feed initial render and
/// `_update` dispatch; writes come from `_action` dispatch.
pub trait SlotStore {
    fn max_vec(&self) -> usize {
        16
    }
    fn max_str(&self) -> usize {
        16
    }
    fn max_num(&self) -> usize {
        16
    }

    fn supports_vec(&self, i: usize) -> bool {
        i < self.max_vec()
    }
    fn supports_str(&self, i: usize) -> bool {
        i < self.max_str()
    }
    fn supports_num(&self, i: usize) -> bool {
        i < self.max_num()
    }

    fn get_vec(&self, i: usize) -> Option<Vec<Point>>;
    fn get_str(&self, i: usize) -> Option<String>;
    fn get_num(&self, i: usize) -> Option<f64>;

    fn set_vec(&mut self, i: usize, v: Vec<Point>) -> bool;
    fn set_str(&mut self, i: usize, s: String) -> bool;
    fn set_num(&mut self, i: usize, v: f64) -> bool;
}

/// Concrete fixed storage for tests and simple applications. A slot reads
/// back only after it has been written.
#[derive(Debug, Default)]
pub struct FixedSlotStore {
    vec: Vec<Option<Vec<Point>>>,
    str_: Vec<Option<String>>,
    num: Vec<Option<f64>>,
}

impl FixedSlotStore {
    pub const SLOTS: usize = 16;

    pub fn new() -> Self {
        Self {
            vec: vec![None; Self::SLOTS],
            str_: vec![None; Self::SLOTS],
            num: vec![None; Self::SLOTS],
        }
    }
}

impl SlotStore for FixedSlotStore {
    fn max_vec(&self) -> usize {
        self.vec.len()
    }
    fn max_str(&self) -> usize {
        self.str_.len()
    }
    fn max_num(&self) -> usize {
        self.num.len()
    }

    fn get_vec(&self, i: usize) -> Option<Vec<Point>> {
        self.vec.get(i)?.clone()
    }
    fn get_str(&self, i: usize) -> Option<String> {
        self.str_.get(i)?.clone()
    }
    fn get_num(&self, i: usize) -> Option<f64> {
        *self.num.get(i)?
    }

    fn set_vec(&mut self, i: usize, v: Vec<Point>) -> bool {
        match self.vec.get_mut(i) {
            Some(slot) => {
                *slot = Some(v);
                true
            }
            None => false,
        }
    }
    fn set_str(&mut self, i: usize, s: String) -> bool {
        match self.str_.get_mut(i) {
            Some(slot) => {
                *slot = Some(s);
                true
            }
            None => false,
        }
    }
    fn set_num(&mut self, i: usize, v: f64) -> bool {
        match self.num.get_mut(i) {
            Some(slot) => {
                *slot = Some(v);
                true
            }
            None => false,
        }
    }
}
