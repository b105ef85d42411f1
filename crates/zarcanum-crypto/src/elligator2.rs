//! Elligator 2 map from a 32-byte hash to an Ed25519 point.
//!
//! Port of CryptoNote `ge_fromfe_frombytes_vartime`. The result is NOT
//! cofactor-cleared; `hash_to_point` multiplies it by 8. Arithmetic here is
//! variable time, which is fine because every input is a public hash.

use curve25519_dalek::edwards::{CompressedEdwardsY, EdwardsPoint};

use crate::CryptoError;

/// Field element mod p = 2^255 - 19, four little-endian 64-bit limbs,
/// always kept fully reduced.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct Fe([u64; 4]);

const P: Fe = Fe([
    0xFFFF_FFFF_FFFF_FFED,
    0xFFFF_FFFF_FFFF_FFFF,
    0xFFFF_FFFF_FFFF_FFFF,
    0x7FFF_FFFF_FFFF_FFFF,
]);

// (p - 5) / 8 = 2^252 - 3
const P_MINUS_5_DIV_8: [u64; 4] = [
    0xFFFF_FFFF_FFFF_FFFD,
    0xFFFF_FFFF_FFFF_FFFF,
    0xFFFF_FFFF_FFFF_FFFF,
    0x0FFF_FFFF_FFFF_FFFF,
];

// p - 2
const P_MINUS_2: [u64; 4] = [
    0xFFFF_FFFF_FFFF_FFEB,
    0xFFFF_FFFF_FFFF_FFFF,
    0xFFFF_FFFF_FFFF_FFFF,
    0x7FFF_FFFF_FFFF_FFFF,
];

// Curve constants, little-endian encodings.

/// sqrt(-1)
const SQRT_M1: [u8; 32] = [
    0xb0, 0xa0, 0x0e, 0x4a, 0x27, 0x1b, 0xee, 0xc4, 0x78, 0xe4, 0x2f, 0xad, 0x06, 0x18, 0x43, 0x2f,
    0xa7, 0xd7, 0xfb, 0x3d, 0x99, 0x00, 0x4d, 0x2b, 0x0b, 0xdf, 0xc1, 0x4f, 0x80, 0x24, 0x83, 0x2b,
];

/// -A, with A = 486662 the Montgomery coefficient.
const NEG_A: [u8; 32] = [
    0xe7, 0x92, 0xf8, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x7f,
];

/// sqrt(-2 * A * (A + 2))
const FFFB1: [u8; 32] = [
    0xff, 0xbd, 0xe3, 0xcd, 0x8a, 0x96, 0x58, 0xdd, 0x72, 0x8c, 0xd5, 0x46, 0x57, 0xfb, 0x6b, 0x2e,
    0x1c, 0xe6, 0x04, 0xbe, 0xc8, 0x3a, 0x56, 0xdf, 0xe8, 0xe4, 0x29, 0x25, 0x10, 0x04, 0x8e, 0x01,
];

/// sqrt(2 * A * (A + 2))
const FFFB2: [u8; 32] = [
    0x0d, 0x65, 0x83, 0x9f, 0x7c, 0x9b, 0x21, 0x2d, 0x20, 0x08, 0xa9, 0xfb, 0xb9, 0xfc, 0x21, 0xae,
    0x41, 0xa0, 0xe9, 0x3f, 0x48, 0xae, 0x2b, 0x6e, 0x09, 0xd3, 0xa5, 0xfb, 0xf5, 0xe1, 0xf9, 0x32,
];

/// sqrt(-sqrt(-1) * A * (A + 2))
const FFFB3: [u8; 32] = [
    0x66, 0x2c, 0x30, 0x17, 0x87, 0x7d, 0x1b, 0x58, 0x29, 0x42, 0x96, 0xa5, 0x4e, 0xff, 0x24, 0x40,
    0xed, 0xa2, 0x0d, 0x3f, 0x40, 0x46, 0x95, 0xb8, 0xef, 0x08, 0xc2, 0x14, 0x0d, 0x11, 0x4a, 0x67,
];

/// sqrt(sqrt(-1) * A * (A + 2))
const FFFB4: [u8; 32] = [
    0x67, 0x6e, 0x4c, 0x49, 0xfc, 0xe6, 0xc2, 0x7a, 0xb6, 0xb5, 0xc0, 0x5e, 0xf7, 0x03, 0xb9, 0x11,
    0xd1, 0xbc, 0x08, 0x81, 0x77, 0x0b, 0x3f, 0xd9, 0x06, 0x24, 0x98, 0xef, 0xfc, 0x0c, 0xbc, 0x65,
];

impl Fe {
    const ZERO: Fe = Fe([0, 0, 0, 0]);
    const ONE: Fe = Fe([1, 0, 0, 0]);

    /// Load all 256 bits and reduce, matching the CryptoNote loader which
    /// does not drop the top bit.
    fn from_bytes(bytes: &[u8; 32]) -> Fe {
        let mut limbs = [0u64; 4];
        for (i, chunk) in bytes.chunks_exact(8).enumerate() {
            let mut word = [0u8; 8];
            word.copy_from_slice(chunk);
            limbs[i] = u64::from_le_bytes(word);
        }
        Fe(limbs).reduce()
    }

    fn to_bytes(self) -> [u8; 32] {
        let mut out = [0u8; 32];
        for (i, limb) in self.0.iter().enumerate() {
            out[i * 8..i * 8 + 8].copy_from_slice(&limb.to_le_bytes());
        }
        out
    }

    fn is_zero(&self) -> bool {
        self.0 == [0; 4]
    }

    fn is_odd(&self) -> bool {
        self.0[0] & 1 == 1
    }

    fn geq(&self, other: &Fe) -> bool {
        for i in (0..4).rev() {
            if self.0[i] != other.0[i] {
                return self.0[i] > other.0[i];
            }
        }
        true
    }

    fn add_raw(&self, other: &Fe) -> (Fe, bool) {
        let mut out = [0u64; 4];
        let mut carry = false;
        for (i, o) in out.iter_mut().enumerate() {
            let (s1, c1) = self.0[i].overflowing_add(other.0[i]);
            let (s2, c2) = s1.overflowing_add(carry as u64);
            *o = s2;
            carry = c1 || c2;
        }
        (Fe(out), carry)
    }

    fn sub_raw(&self, other: &Fe) -> (Fe, bool) {
        let mut out = [0u64; 4];
        let mut borrow = false;
        for (i, o) in out.iter_mut().enumerate() {
            let (d1, b1) = self.0[i].overflowing_sub(other.0[i]);
            let (d2, b2) = d1.overflowing_sub(borrow as u64);
            *o = d2;
            borrow = b1 || b2;
        }
        (Fe(out), borrow)
    }

    fn reduce(mut self) -> Fe {
        while self.geq(&P) {
            self = self.sub_raw(&P).0;
        }
        self
    }

    fn add(&self, other: &Fe) -> Fe {
        // Both operands < p < 2^255, so the raw sum never carries out.
        self.add_raw(other).0.reduce()
    }

    fn sub(&self, other: &Fe) -> Fe {
        if self.geq(other) {
            self.sub_raw(other).0
        } else {
            self.add_raw(&P).0.sub_raw(other).0
        }
    }

    fn neg(&self) -> Fe {
        Fe::ZERO.sub(self)
    }

    fn mul(&self, other: &Fe) -> Fe {
        let mut wide = [0u64; 8];
        for i in 0..4 {
            let mut carry: u128 = 0;
            for j in 0..4 {
                let t = (self.0[i] as u128) * (other.0[j] as u128) + wide[i + j] as u128 + carry;
                wide[i + j] = t as u64;
                carry = t >> 64;
            }
            wide[i + 4] = carry as u64;
        }
        Fe::reduce_wide(&wide)
    }

    fn square(&self) -> Fe {
        self.mul(self)
    }

    /// lo + hi * 2^256, with 2^256 = 38 (mod p).
    fn reduce_wide(wide: &[u64; 8]) -> Fe {
        let mut acc = [0u64; 5];
        let mut carry: u128 = 0;
        for i in 0..4 {
            let t = wide[i] as u128 + (wide[i + 4] as u128) * 38 + carry;
            acc[i] = t as u64;
            carry = t >> 64;
        }
        acc[4] = carry as u64;

        // Fold the fifth limb back in the same way.
        let mut out = [0u64; 4];
        let mut carry: u128 = (acc[4] as u128) * 38;
        for i in 0..4 {
            let t = acc[i] as u128 + carry;
            out[i] = t as u64;
            carry = t >> 64;
        }
        let mut fe = Fe(out);
        if carry != 0 {
            fe = fe.add_raw(&Fe([38, 0, 0, 0])).0;
        }
        fe.reduce()
    }

    fn pow(&self, exp: &[u64; 4]) -> Fe {
        let mut result = Fe::ONE;
        let mut base = *self;
        for limb in exp {
            let mut bits = *limb;
            for _ in 0..64 {
                if bits & 1 == 1 {
                    result = result.mul(&base);
                }
                base = base.square();
                bits >>= 1;
            }
        }
        result
    }

    fn invert(&self) -> Fe {
        self.pow(&P_MINUS_2)
    }
}

/// (u / v)^((p + 3) / 8) computed as u * v^3 * (u * v^7)^((p - 5) / 8).
fn divpowm1(u: &Fe, v: &Fe) -> Fe {
    let v3 = v.square().mul(v);
    let v7 = v3.square().mul(v);
    u.mul(&v3).mul(&u.mul(&v7).pow(&P_MINUS_5_DIV_8))
}

/// Map a 32-byte hash onto the curve (without cofactor clearing).
pub fn ge_fromfe_frombytes_vartime(hash: &[u8; 32]) -> Result<EdwardsPoint, CryptoError> {
    let sqrt_m1 = Fe::from_bytes(&SQRT_M1);
    let neg_a = Fe::from_bytes(&NEG_A);
    // -2A^2 is the same as 2 * (-A)^2 negated
    let a_sq = neg_a.square();
    let minus_2a_sq = a_sq.add(&a_sq).neg();

    let u = Fe::from_bytes(hash);
    let u2 = u.square();
    let v = u2.add(&u2); // 2u^2
    let w = v.add(&Fe::ONE); // 2u^2 + 1
    let mut x = w.square().add(&minus_2a_sq.mul(&u2)); // w^2 - 2A^2u^2

    let mut r_x = divpowm1(&w, &x);
    let mut y = r_x.square().mul(&x);
    let mut z = neg_a;
    let sign: bool;

    if w.sub(&y).is_zero() {
        r_x = r_x.mul(&Fe::from_bytes(&FFFB2)).mul(&u);
        z = z.mul(&v);
        sign = false;
    } else if w.add(&y).is_zero() {
        r_x = r_x.mul(&Fe::from_bytes(&FFFB1)).mul(&u);
        z = z.mul(&v);
        sign = false;
    } else {
        x = x.mul(&sqrt_m1);
        y = r_x.square().mul(&x);
        let k = if w.sub(&y).is_zero() { FFFB4 } else { FFFB3 };
        r_x = r_x.mul(&Fe::from_bytes(&k));
        sign = true;
    }

    if r_x.is_odd() != sign {
        r_x = r_x.neg();
    }

    let proj_z = z.add(&w);
    let proj_y = z.sub(&w);
    let proj_x = r_x.mul(&proj_z);

    let z_inv = proj_z.invert();
    let aff_x = proj_x.mul(&z_inv);
    let aff_y = proj_y.mul(&z_inv);

    let mut compressed = aff_y.to_bytes();
    if aff_x.is_odd() {
        compressed[31] |= 0x80;
    }
    CompressedEdwardsY(compressed)
        .decompress()
        .ok_or(CryptoError::InvalidPoint("elligator2 output"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_inverse() {
        let a = Fe::from_bytes(&[7u8; 32]);
        assert_eq!(a.mul(&a.invert()), Fe::ONE);
    }

    #[test]
    fn test_sqrt_m1_squares_to_minus_one() {
        let s = Fe::from_bytes(&SQRT_M1);
        assert_eq!(s.square(), Fe::ONE.neg());
    }

    #[test]
    fn test_loader_reduces_top_bit() {
        // 2^256 - 1 = 2p + 37
        let all = Fe::from_bytes(&[0xff; 32]);
        assert_eq!(all, Fe([37, 0, 0, 0]));
        assert_eq!(Fe::from_bytes(&all.to_bytes()), all);
    }

    #[test]
    fn test_branch_constants() {
        let neg_a = Fe::from_bytes(&NEG_A);
        let a = neg_a.neg();
        let two = Fe([2, 0, 0, 0]);
        let a_ap2 = a.mul(&a.add(&two));
        let sqm1 = Fe::from_bytes(&SQRT_M1);
        assert_eq!(Fe::from_bytes(&FFFB1).square(), a_ap2.add(&a_ap2).neg());
        assert_eq!(Fe::from_bytes(&FFFB2).square(), a_ap2.add(&a_ap2));
        assert_eq!(Fe::from_bytes(&FFFB3).square(), sqm1.mul(&a_ap2).neg());
        assert_eq!(Fe::from_bytes(&FFFB4).square(), sqm1.mul(&a_ap2));
    }

    #[test]
    fn test_map_is_deterministic() {
        let p1 = ge_fromfe_frombytes_vartime(&[3u8; 32]).unwrap();
        let p2 = ge_fromfe_frombytes_vartime(&[3u8; 32]).unwrap();
        assert_eq!(p1, p2);
        assert_ne!(p1, ge_fromfe_frombytes_vartime(&[4u8; 32]).unwrap());
    }
}
