//! GF(2^8) field law properties (spec.md §4.1).

use quickcheck_macros::quickcheck;

#[quickcheck]
fn add_is_commutative(a: u8, b: u8) -> bool {
    pph::gf256::add(a, b) == pph::gf256::add(b, a)
}

#[quickcheck]
fn add_is_its_own_inverse(a: u8, b: u8) -> bool {
    pph::gf256::add(pph::gf256::add(a, b), b) == a
}

#[quickcheck]
fn mul_is_commutative(a: u8, b: u8) -> bool {
    pph::gf256::mul(a, b) == pph::gf256::mul(b, a)
}

#[quickcheck]
fn mul_distributes_over_add(a: u8, b: u8, c: u8) -> bool {
    let lhs = pph::gf256::mul(a, pph::gf256::add(b, c));
    let rhs = pph::gf256::add(pph::gf256::mul(a, b), pph::gf256::mul(a, c));
    lhs == rhs
}

#[quickcheck]
fn div_undoes_mul_for_nonzero_divisor(a: u8, b: u8) -> bool {
    if b == 0 {
        return true;
    }
    pph::gf256::div(pph::gf256::mul(a, b), b) == a
}
