//! Canonical binary form of a transaction.
//!
//! Layout rules: version and container lengths are varints, every container
//! element is a one-byte variant tag followed by its value, fixed-width
//! integers are little-endian, points and scalars are their 32-byte
//! encodings, strings are varint length plus bytes.

use curve25519_dalek::edwards::EdwardsPoint;
use curve25519_dalek::scalar::Scalar;
use zarcanum_crypto::aggregation::UgAggregationProof;
use zarcanum_crypto::bge::BgeProof;
use zarcanum_crypto::bulletproofs_plus::BppSignature;
use zarcanum_crypto::clsag_ggx::ClsagGgxSignature;
use zarcanum_crypto::keccak256;
use zarcanum_types::varint::write_varint;

use crate::types::{ExtraEntry, OutReference, Proof, Signature, Transaction, TxIn, TxOut};

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn write_point(buf: &mut Vec<u8>, p: &EdwardsPoint) {
    buf.extend_from_slice(p.compress().as_bytes());
}

fn write_scalar(buf: &mut Vec<u8>, s: &Scalar) {
    buf.extend_from_slice(s.as_bytes());
}

fn write_points(buf: &mut Vec<u8>, ps: &[EdwardsPoint]) {
    write_varint(buf, ps.len() as u64);
    for p in ps {
        write_point(buf, p);
    }
}

fn write_scalars(buf: &mut Vec<u8>, ss: &[Scalar]) {
    write_varint(buf, ss.len() as u64);
    for s in ss {
        write_scalar(buf, s);
    }
}

fn write_string(buf: &mut Vec<u8>, bytes: &[u8]) {
    write_varint(buf, bytes.len() as u64);
    buf.extend_from_slice(bytes);
}

// ─── Prefix ──────────────────────────────────────────────────────────────────

fn write_out_reference(buf: &mut Vec<u8>, r: &OutReference) {
    buf.push(r.tag().as_u8());
    match r {
        OutReference::GlobalIndex(i) => buf.extend_from_slice(&i.to_le_bytes()),
        OutReference::RefById { tx_id, n } => {
            buf.extend_from_slice(tx_id.as_bytes());
            buf.extend_from_slice(&n.to_le_bytes());
        }
    }
}

fn write_input(buf: &mut Vec<u8>, input: &TxIn) {
    buf.push(input.tag().as_u8());
    match input {
        TxIn::ZcInput(zc) => {
            write_varint(buf, zc.key_offsets.len() as u64);
            for r in &zc.key_offsets {
                write_out_reference(buf, r);
            }
            write_point(buf, &zc.key_image);
            // etc_details
            write_varint(buf, 0);
        }
    }
}

fn write_extra(buf: &mut Vec<u8>, e: &ExtraEntry) {
    buf.push(e.tag().as_u8());
    match e {
        ExtraEntry::PubKey(p) => write_point(buf, p),
        ExtraEntry::EtcTxFlags16(f) => buf.extend_from_slice(&f.to_le_bytes()),
        ExtraEntry::DerivationHint(h) => write_string(buf, &h.to_le_bytes()),
        ExtraEntry::ZarcanumTxDataV1 { fee } => buf.extend_from_slice(&fee.to_le_bytes()),
    }
}

fn write_output(buf: &mut Vec<u8>, out: &TxOut) {
    buf.push(out.tag().as_u8());
    match out {
        TxOut::Zarcanum(o) => {
            write_point(buf, &o.stealth_address);
            write_point(buf, &o.concealing_point);
            write_point(buf, &o.amount_commitment);
            write_point(buf, &o.blinded_asset_id);
            buf.extend_from_slice(&o.encrypted_amount.to_le_bytes());
            buf.push(o.mix_attr);
        }
    }
}

fn write_prefix(buf: &mut Vec<u8>, tx: &Transaction) {
    write_varint(buf, tx.version);
    write_varint(buf, tx.vin.len() as u64);
    for input in &tx.vin {
        write_input(buf, input);
    }
    write_varint(buf, tx.extra.len() as u64);
    for e in &tx.extra {
        write_extra(buf, e);
    }
    write_varint(buf, tx.vout.len() as u64);
    for out in &tx.vout {
        write_output(buf, out);
    }
}

/// Serialize version, inputs, extra and outputs.
pub fn prefix_blob(tx: &Transaction) -> Vec<u8> {
    let mut buf = Vec::with_capacity(256 + 170 * tx.vout.len());
    write_prefix(&mut buf, tx);
    buf
}

/// Keccak-256 of the prefix: the transaction id and the message every
/// signature and proof commits to.
pub fn prefix_hash(tx: &Transaction) -> [u8; 32] {
    keccak256(&prefix_blob(tx))
}

// ─── Signatures and proofs ───────────────────────────────────────────────────

fn write_clsag_ggx(buf: &mut Vec<u8>, sig: &ClsagGgxSignature) {
    write_scalar(buf, &sig.c);
    write_scalars(buf, &sig.r_g);
    write_scalars(buf, &sig.r_x);
    write_point(buf, &sig.k1);
    write_point(buf, &sig.k2);
}

fn write_signature(buf: &mut Vec<u8>, sig: &Signature) {
    buf.push(sig.tag().as_u8());
    match sig {
        Signature::Zc(zc) => {
            write_point(buf, &zc.pseudo_out_amount_commitment);
            write_point(buf, &zc.pseudo_out_blinded_asset_id);
            write_clsag_ggx(buf, &zc.clsag_ggx);
        }
    }
}

fn write_bge(buf: &mut Vec<u8>, p: &BgeProof) {
    write_point(buf, &p.a);
    write_point(buf, &p.b);
    write_points(buf, &p.pk);
    write_scalars(buf, &p.f);
    write_scalar(buf, &p.y);
    write_scalar(buf, &p.z);
}

fn write_bpp(buf: &mut Vec<u8>, p: &BppSignature) {
    write_points(buf, &p.lv);
    write_points(buf, &p.rv);
    write_point(buf, &p.a0);
    write_point(buf, &p.a);
    write_point(buf, &p.b);
    write_scalar(buf, &p.r);
    write_scalar(buf, &p.s);
    write_scalar(buf, &p.delta);
}

fn write_aggregation(buf: &mut Vec<u8>, p: &UgAggregationProof) {
    write_points(buf, &p.amount_commitments_for_rp_aggregation);
    write_scalars(buf, &p.y0s);
    write_scalars(buf, &p.y1s);
    write_scalar(buf, &p.c);
}

fn write_proof(buf: &mut Vec<u8>, proof: &Proof) {
    buf.push(proof.tag().as_u8());
    match proof {
        Proof::AssetSurjection(p) => {
            write_varint(buf, p.bge_proofs.len() as u64);
            for bge in &p.bge_proofs {
                write_bge(buf, bge);
            }
        }
        Proof::OutsRange(p) => {
            write_bpp(buf, &p.bpp);
            write_aggregation(buf, &p.aggregation_proof);
        }
        Proof::Balance(p) => {
            write_scalar(buf, &p.dss.c);
            write_scalar(buf, &p.dss.y0);
            write_scalar(buf, &p.dss.y1);
        }
    }
}

/// Serialize the full signed transaction: prefix, attachment, signatures,
/// proofs.
pub fn transaction_blob(tx: &Transaction) -> Vec<u8> {
    let mut buf = Vec::with_capacity(4096);
    write_prefix(&mut buf, tx);
    write_varint(&mut buf, tx.attachment.len() as u64);
    write_varint(&mut buf, tx.signatures.len() as u64);
    for sig in &tx.signatures {
        write_signature(&mut buf, sig);
    }
    write_varint(&mut buf, tx.proofs.len() as u64);
    for proof in &tx.proofs {
        write_proof(&mut buf, proof);
    }
    buf
}
