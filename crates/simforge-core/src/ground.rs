//! Flat arena layout for ground variables.
//!
//! Each schema's ground instances occupy a contiguous block of slots; within
//! a block the argument tuple is encoded mixed-radix, row-major over the
//! parameter object domains in declaration order. This is the enumeration
//! order reused everywhere: grounding, the evaluation plan, observations.

use smallvec::SmallVec;

use crate::schema::{Layer, SchemaId, SchemaTable};
use crate::types::TypeRegistry;

/// Index of a ground variable in the flat value arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroundVarId(pub usize);

#[derive(Debug, Clone)]
struct SchemaLayout {
    base: usize,
    count: usize,
    sizes: SmallVec<[usize; 4]>,
    strides: SmallVec<[usize; 4]>,
    /// Offset into the compact primed buffer; state schemas only.
    primed_offset: Option<usize>,
}

/// Mixed-radix layout over all schemas' ground instances.
#[derive(Debug, Clone)]
pub struct GroundLayout {
    per_schema: Vec<SchemaLayout>,
    bases: Vec<usize>,
    total: usize,
    primed_len: usize,
}

impl GroundLayout {
    pub fn new(schemas: &SchemaTable, registry: &TypeRegistry) -> Self {
        let mut per_schema = Vec::with_capacity(schemas.len());
        let mut bases = Vec::with_capacity(schemas.len());
        let mut total = 0usize;
        let mut primed_len = 0usize;

        for (_, schema) in schemas.iter() {
            let sizes: SmallVec<[usize; 4]> = schema
                .params
                .iter()
                .map(|&ty| registry.domain_size(ty))
                .collect();
            let count = sizes.iter().product::<usize>();
            let mut strides: SmallVec<[usize; 4]> = SmallVec::with_capacity(sizes.len());
            let mut stride = count;
            for &size in &sizes {
                stride /= size.max(1);
                strides.push(stride);
            }
            let primed_offset = if schema.layer == Layer::State {
                let off = primed_len;
                primed_len += count;
                Some(off)
            } else {
                None
            };
            bases.push(total);
            per_schema.push(SchemaLayout {
                base: total,
                count,
                sizes,
                strides,
                primed_offset,
            });
            total += count;
        }

        Self {
            per_schema,
            bases,
            total,
            primed_len,
        }
    }

    /// Total number of ground variables across all schemas.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Length of the compact primed (next-state) buffer.
    pub fn primed_len(&self) -> usize {
        self.primed_len
    }

    pub fn count(&self, schema: SchemaId) -> usize {
        self.per_schema[schema.0].count
    }

    /// Resolves a schema plus concrete argument tuple to its arena slot.
    ///
    /// Returns `None` on arity mismatch or an argument index outside its
    /// type's domain.
    pub fn ground_var(&self, schema: SchemaId, args: &[usize]) -> Option<GroundVarId> {
        let layout = self.per_schema.get(schema.0)?;
        if args.len() != layout.sizes.len() {
            return None;
        }
        let mut offset = 0usize;
        for ((&arg, &size), &stride) in args.iter().zip(&layout.sizes).zip(&layout.strides) {
            if arg >= size {
                return None;
            }
            offset += arg * stride;
        }
        Some(GroundVarId(layout.base + offset))
    }

    /// Inverse of [`ground_var`](Self::ground_var).
    pub fn decode(&self, gv: GroundVarId) -> (SchemaId, SmallVec<[usize; 4]>) {
        let schema = self.schema_of(gv);
        let layout = &self.per_schema[schema.0];
        let mut offset = gv.0 - layout.base;
        let mut args: SmallVec<[usize; 4]> = SmallVec::with_capacity(layout.sizes.len());
        for &stride in &layout.strides {
            args.push(offset / stride);
            offset %= stride;
        }
        (schema, args)
    }

    pub fn schema_of(&self, gv: GroundVarId) -> SchemaId {
        let idx = self.bases.partition_point(|&base| base <= gv.0);
        SchemaId(idx - 1)
    }

    /// All ground instances of a schema, in argument-tuple enumeration order.
    pub fn instances(&self, schema: SchemaId) -> impl Iterator<Item = GroundVarId> {
        let layout = &self.per_schema[schema.0];
        (layout.base..layout.base + layout.count).map(GroundVarId)
    }

    pub(crate) fn primed_index(&self, gv: GroundVarId) -> Option<usize> {
        let schema = self.schema_of(gv);
        let layout = &self.per_schema[schema.0];
        layout.primed_offset.map(|off| off + (gv.0 - layout.base))
    }

    pub(crate) fn state_blocks(&self) -> impl Iterator<Item = (usize, usize, usize)> + '_ {
        self.per_schema
            .iter()
            .filter_map(|l| l.primed_offset.map(|off| (l.base, l.count, off)))
    }

    pub(crate) fn block(&self, schema: SchemaId) -> (usize, usize) {
        let layout = &self.per_schema[schema.0];
        (layout.base, layout.count)
    }
}
