//! Unbounded memo table: open addressing with Robin-Hood displacement.
//!
//! Each slot has a packed word, `displacement << 32 | hash`, and a separate
//! entry. A zero word marks an empty slot, so hashes are never zero.

use std::hash::BuildHasher;

use hashbrown::hash_map::DefaultHashBuilder;

use super::{MemoContext, MemoEntry, Memoizer};
use crate::context::Key;

const INITIAL_CAPACITY: usize = 8;
const LOAD_FACTOR: f64 = 0.8;

fn pack(displacement: usize, hash: u32) -> u64 {
    ((displacement as u64) << 32) | hash as u64
}

fn unpack(word: u64) -> (usize, u32) {
    ((word >> 32) as usize, word as u32)
}

pub struct MemoTable<V, C> {
    words: Vec<u64>,
    entries: Vec<Option<MemoEntry<V, C>>>,
    len: usize,
    max_displacement: usize,
    unit_sensitive: bool,
    hasher: DefaultHashBuilder,
}

impl<V, C: MemoContext> MemoTable<V, C> {
    pub fn new(unit_sensitive: bool) -> Self {
        Self::with_capacity(INITIAL_CAPACITY, unit_sensitive)
    }

    fn with_capacity(capacity: usize, unit_sensitive: bool) -> Self {
        let capacity = capacity.next_power_of_two();
        Self {
            words: vec![0; capacity],
            entries: std::iter::repeat_with(|| None).take(capacity).collect(),
            len: 0,
            max_displacement: 0,
            unit_sensitive,
            hasher: DefaultHashBuilder::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.words.len()
    }

    pub fn max_displacement(&self) -> usize {
        self.max_displacement
    }

    fn hash(&self, unit: Key, pos: usize, ctx: &C) -> u32 {
        let full = if self.unit_sensitive {
            self.hasher.hash_one((unit, pos, ctx))
        } else {
            self.hasher.hash_one((pos, ctx))
        };
        match (full ^ (full >> 32)) as u32 {
            0 => 1,
            hash => hash,
        }
    }

    fn matches(&self, entry: &MemoEntry<V, C>, unit: Key, pos: usize, ctx: &C) -> bool {
        entry.start == pos && entry.ctx == *ctx && (!self.unit_sensitive || entry.unit == unit)
    }

    /// Place an entry, pushing richer occupants further down the probe
    /// sequence when the incoming entry has travelled further than them.
    fn place(&mut self, mut hash: u32, mut entry: MemoEntry<V, C>) {
        let mask = self.capacity() - 1;
        let mut index = hash as usize & mask;
        let mut displacement = 0;
        loop {
            let word = self.words[index];
            if word == 0 {
                self.words[index] = pack(displacement, hash);
                self.entries[index] = Some(entry);
                self.max_displacement = self.max_displacement.max(displacement);
                return;
            }
            let (occupant_displacement, occupant_hash) = unpack(word);
            if occupant_displacement < displacement {
                self.words[index] = pack(displacement, hash);
                self.max_displacement = self.max_displacement.max(displacement);
                let occupant = self.entries[index].as_mut().expect("occupied slot holds an entry");
                std::mem::swap(&mut entry, occupant);
                hash = occupant_hash;
                displacement = occupant_displacement;
            }
            index = (index + 1) & mask;
            displacement += 1;
        }
    }

    fn rehash(&mut self) {
        let capacity = self.capacity() * 2;
        let words = std::mem::replace(&mut self.words, vec![0; capacity]);
        let entries = std::mem::replace(
            &mut self.entries,
            std::iter::repeat_with(|| None).take(capacity).collect(),
        );
        self.max_displacement = 0;
        for (word, entry) in words.into_iter().zip(entries) {
            if let Some(entry) = entry {
                self.place(unpack(word).1, entry);
            }
        }
    }
}

impl<V, C: MemoContext> Memoizer<V, C> for MemoTable<V, C> {
    fn memoize(&mut self, entry: MemoEntry<V, C>) {
        if (self.len + 1) as f64 > self.capacity() as f64 * LOAD_FACTOR {
            self.rehash();
        }
        let hash = self.hash(entry.unit, entry.start, &entry.ctx);
        self.place(hash, entry);
        self.len += 1;
    }

    fn get(&mut self, unit: Key, pos: usize, ctx: &C) -> Option<MemoEntry<V, C>> {
        let hash = self.hash(unit, pos, ctx);
        let mask = self.capacity() - 1;
        let mut index = hash as usize & mask;
        for _ in 0..=self.max_displacement {
            let word = self.words[index];
            if word == 0 {
                return None;
            }
            if unpack(word).1 == hash {
                if let Some(entry) = &self.entries[index] {
                    if self.matches(entry, unit, pos, ctx) {
                        return Some(entry.clone());
                    }
                }
            }
            index = (index + 1) & mask;
        }
        None
    }
}
