//! Name table: deduplicated string pool with deferred relocation
//!
//! Every structure that stores a human-readable name (bones, materials,
//! buffers, animation tracks) writes a 4-byte placeholder and registers a
//! reservation here. Once the whole archive is laid out, `pool_names`
//! materializes one deduplicated pool and `resolve` patches every
//! placeholder with `pool_position + pool_base - struct_start` as a signed
//! delta. Single-pass resolution is impossible: the pool cannot be placed
//! until every name-bearing structure has been visited.
//!
//! Pool entry layout: u32 BE length prefix, raw bytes, NUL, zero-padded to
//! 4-byte alignment. Name references point at the raw bytes; the length
//! prefix sits at `offset - 4`.

use crate::error::Result;
use crate::io::{BinReader, BinWriter};
use hashbrown::HashMap;

pub type NameHandle = u32;

#[derive(Debug)]
struct NameEntry {
    name: String,
    struct_pos: u32,
    write_pos: usize,
    #[allow(dead_code)]
    nonvolatile: bool,
    id: NameHandle,
}

/// Accumulates name reservations for one write pass.
///
/// Deliberately not shared between archives: construct one per `write`
/// call, or names from unrelated archives would contaminate each other's
/// pool. `resolve` clears the reservation list, making reuse a no-op
/// rather than a corruption.
#[derive(Debug, Default)]
pub struct NameTable {
    entries: Vec<NameEntry>,
    counter: NameHandle,
    /// handle -> negated pool offset of the string bytes, filled by
    /// `pool_names`
    mapping: HashMap<NameHandle, i64>,
    pool: Vec<u8>,
}

impl NameTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a pending relocation. `struct_pos` is the offset the final
    /// delta is measured from; `write_pos` is where the patched s32 lives.
    pub fn reserve(
        &mut self,
        name: &str,
        struct_pos: u32,
        write_pos: usize,
        nonvolatile: bool,
    ) -> NameHandle {
        debug_assert!(struct_pos < 0xFF_FFFF);
        let id = self.counter;
        self.counter += 1;
        self.entries.push(NameEntry {
            name: name.to_string(),
            struct_pos,
            write_pos,
            nonvolatile,
            id,
        });
        id
    }

    /// Lay out the deduplicated pool. Names are sorted lexicographically
    /// first; the sort order is part of the format's byte layout.
    pub fn pool_names(&mut self) {
        self.mapping.clear();
        self.pool.clear();

        self.entries.sort_by(|a, b| a.name.cmp(&b.name));

        // name -> position of its string bytes in the pool
        let mut seen: HashMap<&str, i64> = HashMap::new();
        let mut pool = Vec::new();
        let mut mapping = HashMap::new();

        for entry in &self.entries {
            let position = match seen.get(entry.name.as_str()) {
                Some(&position) => position,
                None => {
                    pool.extend_from_slice(&(entry.name.len() as u32).to_be_bytes());
                    let position = pool.len() as i64;
                    pool.extend_from_slice(entry.name.as_bytes());
                    pool.push(0);
                    while pool.len() % 4 != 0 {
                        pool.push(0);
                    }
                    seen.insert(entry.name.as_str(), position);
                    position
                }
            };
            mapping.insert(entry.id, -position);
        }

        self.pool = pool;
        self.mapping = mapping;
    }

    pub fn pool(&self) -> &[u8] {
        &self.pool
    }

    /// Patch every reservation against a pool placed at `pool_base`.
    /// Consumes the reservation list; the table is spent afterwards.
    pub fn resolve(&mut self, writer: &mut BinWriter, pool_base: u32) {
        for entry in self.entries.drain(..) {
            let pool_position = (-self.mapping[&entry.id]) as u32;
            let delta = pool_position + pool_base - entry.struct_pos;
            writer.write_i32_at(entry.write_pos, delta as i32);
        }
    }

    #[cfg(test)]
    fn pending(&self) -> usize {
        self.entries.len()
    }
}

/// Write a name reference field: empty names write a literal 0 and are
/// never pooled; anything else reserves a patch point.
pub fn write_name_forward(
    table: &mut NameTable,
    writer: &mut BinWriter,
    struct_start: u32,
    name: &str,
    nonvolatile: bool,
) {
    if name.is_empty() {
        writer.write_u32(0);
        return;
    }
    table.reserve(name, struct_start, writer.tell(), nonvolatile);
    writer.write_u32(0);
}

/// Read a name reference field written by `write_name_forward`: an s32
/// delta relative to `struct_start`, 0 meaning the empty name.
pub fn read_name(reader: &mut BinReader<'_>, struct_start: usize) -> Result<String> {
    let delta = reader.i32()?;
    if delta == 0 {
        return Ok(String::new());
    }
    reader.cstring_at((struct_start as i64 + delta as i64) as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_single_slot() {
        let mut table = NameTable::new();
        let mut w = BinWriter::new();

        // Two structures, same name
        let a = w.reserve_u32();
        table.reserve("bone_a", 0, a, false);
        let b = w.reserve_u32();
        table.reserve("bone_a", 4, b, false);

        table.pool_names();
        // 4 (length) + 6 (bytes) + 1 (NUL) -> padded to 12
        assert_eq!(table.pool().len(), 12);
    }

    #[test]
    fn test_pool_sorted_lexicographically() {
        let mut table = NameTable::new();
        let mut w = BinWriter::new();
        for name in ["zzz", "aaa"] {
            let pos = w.reserve_u32();
            table.reserve(name, 0, pos, false);
        }
        table.pool_names();

        // "aaa" first despite reservation order
        assert_eq!(&table.pool()[4..7], b"aaa");
        assert_eq!(&table.pool()[12..15], b"zzz");
    }

    #[test]
    fn test_resolve_deltas() {
        let mut table = NameTable::new();
        let mut w = BinWriter::new();

        w.write_u32(0xEEEE_EEEE); // some structure header at 0
        let field = w.reserve_u32(); // name field at 4, owner starts at 0
        table.reserve("abc", 0, field, false);

        table.pool_names();
        let pool_base = w.tell() as u32;
        let pool = table.pool().to_vec();
        w.write_bytes(&pool);
        table.resolve(&mut w, pool_base);

        let bytes = w.into_bytes();
        let mut r = BinReader::new(&bytes);
        r.seek_set(4);
        // Delta from owner (0) to the string bytes (pool_base + 4)
        assert_eq!(r.i32().unwrap(), pool_base as i32 + 4);
        assert_eq!(r.cstring_at(pool_base as usize + 4).unwrap(), "abc");
    }

    #[test]
    fn test_resolve_clears_entries() {
        let mut table = NameTable::new();
        let mut w = BinWriter::new();
        let pos = w.reserve_u32();
        table.reserve("x", 0, pos, false);
        table.pool_names();
        let base = w.tell() as u32;
        let pool = table.pool().to_vec();
        w.write_bytes(&pool);
        table.resolve(&mut w, base);
        assert_eq!(table.pending(), 0);
    }

    #[test]
    fn test_empty_name_writes_zero() {
        let mut table = NameTable::new();
        let mut w = BinWriter::new();
        write_name_forward(&mut table, &mut w, 0, "", false);
        assert_eq!(w.into_bytes(), vec![0, 0, 0, 0]);
        table.pool_names();
        assert!(table.pool().is_empty());
    }

    #[test]
    fn test_read_name_roundtrip() {
        let mut table = NameTable::new();
        let mut w = BinWriter::new();
        w.write_u32(0); // padding so the struct doesn't start at 0
        let struct_start = w.tell() as u32;
        write_name_forward(&mut table, &mut w, struct_start, "drv_kart", false);
        table.pool_names();
        let base = w.tell() as u32;
        let pool = table.pool().to_vec();
        w.write_bytes(&pool);
        table.resolve(&mut w, base);

        let bytes = w.into_bytes();
        let mut r = BinReader::new(&bytes);
        r.seek_set(struct_start as usize);
        assert_eq!(read_name(&mut r, struct_start as usize).unwrap(), "drv_kart");
    }
}
