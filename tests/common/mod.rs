#![allow(dead_code)]

use rcgen::{BasicConstraints, CertificateParams, DnType, IsCa, Issuer, KeyPair};
use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};

/// A leaf certificate issued by its own throwaway CA, plus the leaf key.
#[derive(Debug, Clone)]
pub struct Identity {
    pub common_name: String,
    pub leaf_pem: String,
    pub ca_pem: String,
    pub key_pem: String,
    pub leaf_der: Vec<u8>,
    pub ca_der: Vec<u8>,
    pub key_der: Vec<u8>,
}

impl Identity {
    /// Leaf followed by the CA, as found in a chain file.
    pub fn chain_pem(&self) -> String {
        format!("{}\n{}", self.leaf_pem.trim_end(), self.ca_pem)
    }

    /// Chain followed by the key, as found in a single combined file.
    pub fn combined_pem(&self) -> String {
        format!("{}\n{}", self.chain_pem().trim_end(), self.key_pem)
    }
}

pub fn issue(common_name: &str) -> Identity {
    let ca_key = KeyPair::generate().unwrap();
    let mut ca_params = CertificateParams::new(Vec::<String>::new()).unwrap();
    ca_params
        .distinguished_name
        .push(DnType::CommonName, format!("{common_name} CA"));
    ca_params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    let ca_cert = ca_params.self_signed(&ca_key).unwrap();
    let issuer = Issuer::new(ca_params, ca_key);

    let leaf_key = KeyPair::generate().unwrap();
    let mut leaf_params = CertificateParams::new(vec![common_name.to_string()]).unwrap();
    leaf_params
        .distinguished_name
        .push(DnType::CommonName, common_name);
    let leaf = leaf_params.signed_by(&leaf_key, &issuer).unwrap();

    Identity {
        common_name: common_name.to_string(),
        leaf_pem: leaf.pem(),
        ca_pem: ca_cert.pem(),
        key_pem: leaf_key.serialize_pem(),
        leaf_der: leaf.der().to_vec(),
        ca_der: ca_cert.der().to_vec(),
        key_der: leaf_key.serialize_der(),
    }
}

/// Writes `contents` and moves the file's modification time `offset_secs`
/// into the future, so consecutive rewrites are always observable even on
/// file systems with coarse timestamps.
pub fn write_rotated(path: &Path, contents: &str, offset_secs: u64) {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, contents).unwrap();
    fs::File::options()
        .write(true)
        .open(&tmp)
        .unwrap()
        .set_modified(SystemTime::now() + Duration::from_secs(offset_secs))
        .unwrap();
    fs::rename(&tmp, path).unwrap();
}
