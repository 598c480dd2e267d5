/// Pass mask: bit 0 is the main view, bits 1..=63 are shadow cascades.
///
/// Culling only ever clears bits, so a mask can be intersected down the
/// tree but never regrows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CullMask(u64);

impl CullMask {
    pub const EMPTY: CullMask = CullMask(0);
    pub const MAIN: CullMask = CullMask(1);
    /// Highest usable cascade index
    pub const MAX_CASCADE: u8 = 63;

    pub const fn from_bits(bits: u64) -> Self {
        CullMask(bits)
    }

    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Bit of shadow cascade `index` (1..=63).
    pub const fn cascade(index: u8) -> Self {
        CullMask(1u64 << index)
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, other: CullMask) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn intersects(self, other: CullMask) -> bool {
        self.0 & other.0 != 0
    }

    pub const fn has_main(self) -> bool {
        self.0 & 1 != 0
    }

    pub const fn shadows(self) -> CullMask {
        CullMask(self.0 & !1)
    }

    pub const fn has_shadows(self) -> bool {
        self.0 & !1 != 0
    }

    pub const fn intersection(self, other: CullMask) -> CullMask {
        CullMask(self.0 & other.0)
    }

    pub const fn union(self, other: CullMask) -> CullMask {
        CullMask(self.0 | other.0)
    }

    pub fn remove(&mut self, other: CullMask) {
        self.0 &= !other.0;
    }

    pub fn insert(&mut self, other: CullMask) {
        self.0 |= other.0;
    }

    /// `true` if every bit of `self` is also set in `superset`.
    pub const fn is_subset_of(self, superset: CullMask) -> bool {
        superset.contains(self)
    }
}
