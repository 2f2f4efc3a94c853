// Copyright 2024 MaidSafe.net limited.
//
// This SAFE Network Software is licensed to you under The General Public License (GPL), version 3.
// Unless required by applicable law or agreed to in writing, the SAFE Network Software distributed
// under the GPL Licence is distributed on an "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied. Please review the Licences for the specific language governing
// permissions and limitations relating to use of the SAFE Network Software.

use crate::{
    enrollment::{Enrollment, SigningIdentity},
    error::{Error, Result},
    key::PrivateKey,
};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, trace};

pub const SIGNCERTS_DIR: &str = "signcerts";
pub const KEYSTORE_DIR: &str = "keystore";
pub const CACERTS_DIR: &str = "cacerts";
pub const TLSCACERTS_DIR: &str = "tlscacerts";
pub const ADMINCERTS_DIR: &str = "admincerts";
pub const INTERMEDIATECERTS_DIR: &str = "intermediatecerts";

const SIGNCERT_FILE: &str = "cert.pem";
const KEY_FILE: &str = "key.pem";
const CACERT_FILE: &str = "ca.pem";

/// The membership directory of a node or user, e.g. `<core dir>/peer1/msp`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrustStore {
    root: PathBuf,
}

impl TrustStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn signcert_path(&self) -> PathBuf {
        self.root.join(SIGNCERTS_DIR).join(SIGNCERT_FILE)
    }

    pub fn key_path(&self) -> PathBuf {
        self.root.join(KEYSTORE_DIR).join(KEY_FILE)
    }

    pub fn cacert_path(&self) -> PathBuf {
        self.root.join(CACERTS_DIR).join(CACERT_FILE)
    }

    pub fn admincerts_dir(&self) -> PathBuf {
        self.root.join(ADMINCERTS_DIR)
    }

    pub fn tlscacerts_dir(&self) -> PathBuf {
        self.root.join(TLSCACERTS_DIR)
    }

    /// Whether an enrollment has already been materialized here.
    pub fn exists(&self) -> bool {
        self.signcert_path().is_file()
    }

    /// Lays out the enrollment. With `as_admin` the signing certificate is also listed as an
    /// admin certificate of this store.
    pub fn materialize(&self, enrollment: &Enrollment, as_admin: bool) -> Result<()> {
        debug!(
            "Materializing the enrollment of '{}' at {:?} (admin: {as_admin})",
            enrollment.enrollment_id(),
            self.root
        );
        write_if_changed(&self.signcert_path(), enrollment.cert_pem())?;
        if let Some(key) = enrollment.private_key() {
            write_if_changed(&self.key_path(), key.pem())?;
        }
        write_if_changed(&self.cacert_path(), enrollment.ca_cert_pem())?;
        if as_admin {
            write_if_changed(
                &self.admincerts_dir().join(SIGNCERT_FILE),
                enrollment.cert_pem(),
            )?;
        }
        Ok(())
    }

    /// Copies the CA roots to `tlscacerts` when that directory is absent and removes the files
    /// left in `intermediatecerts`.
    pub fn complete_setup(&self) -> Result<()> {
        let tlscacerts = self.tlscacerts_dir();
        if !tlscacerts.exists() {
            let cacerts = self.root.join(CACERTS_DIR);
            if !cacerts.is_dir() {
                return Err(Error::MissingTrustMaterial(self.root.clone(), CACERTS_DIR));
            }
            fs::create_dir_all(&tlscacerts)?;
            for entry in fs::read_dir(&cacerts)? {
                let entry = entry?;
                if entry.file_type()?.is_file() {
                    fs::copy(entry.path(), tlscacerts.join(entry.file_name()))?;
                }
            }
        }

        let intermediates = self.root.join(INTERMEDIATECERTS_DIR);
        if intermediates.is_dir() {
            for entry in fs::read_dir(&intermediates)? {
                let entry = entry?;
                if entry.file_type()?.is_file() {
                    trace!("Removing stale intermediate certificate {:?}", entry.path());
                    fs::remove_file(entry.path())?;
                }
            }
        }
        Ok(())
    }

    /// Lists another identity's certificate as an admin of this store, as `<name>-cert.pem`.
    pub fn install_admin_cert(&self, name: &str, cert_pem: &str) -> Result<()> {
        write_if_changed(
            &self.admincerts_dir().join(format!("{name}-cert.pem")),
            cert_pem,
        )?;
        Ok(())
    }

    pub fn signcert_pem(&self) -> Result<String> {
        self.read_required(self.signcert_path(), SIGNCERTS_DIR)
    }

    pub fn cacert_pem(&self) -> Result<String> {
        self.read_required(self.cacert_path(), CACERTS_DIR)
    }

    pub fn admin_cert_pems(&self) -> Result<Vec<String>> {
        read_pem_dir(&self.admincerts_dir())
    }

    pub fn tls_cacert_pems(&self) -> Result<Vec<String>> {
        read_pem_dir(&self.tlscacerts_dir())
    }

    /// The identity of this store's owner, for signing on behalf of `msp_id`.
    pub fn signing_identity(&self, msp_id: &str) -> Result<SigningIdentity> {
        let cert_pem = self.signcert_pem()?;
        let key_pem = self.read_required(self.key_path(), KEYSTORE_DIR)?;
        Ok(SigningIdentity::new(
            msp_id,
            cert_pem,
            PrivateKey::from_pem(&key_pem)?,
        ))
    }

    fn read_required(&self, path: PathBuf, what: &'static str) -> Result<String> {
        if !path.is_file() {
            return Err(Error::MissingTrustMaterial(self.root.clone(), what));
        }
        Ok(fs::read_to_string(path)?)
    }
}

/// Files of `dir` in name order; a missing directory holds no certificates.
fn read_pem_dir(dir: &Path) -> Result<Vec<String>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut paths = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()?;
    paths.retain(|p| p.is_file());
    paths.sort();
    paths
        .into_iter()
        .map(|p| fs::read_to_string(p).map_err(Error::from))
        .collect()
}

/// Returns whether the file was written.
pub fn write_if_changed(path: &Path, contents: &str) -> Result<bool> {
    if let Ok(existing) = fs::read_to_string(path) {
        if existing == contents {
            trace!("{path:?} is up to date");
            return Ok(false);
        }
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)?;
    Ok(true)
}

/// File names of a TLS certificate, key and CA root inside one directory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TlsLayout {
    pub dir: PathBuf,
    pub cert_file: String,
    pub key_file: String,
    pub ca_file: String,
}

impl TlsLayout {
    /// Writes a TLS enrollment. Its private key must have been generated locally.
    pub fn write(&self, enrollment: &Enrollment, key: &PrivateKey) -> Result<()> {
        write_if_changed(&self.dir.join(&self.cert_file), enrollment.cert_pem())?;
        write_if_changed(&self.dir.join(&self.key_file), key.pem())?;
        write_if_changed(&self.dir.join(&self.ca_file), enrollment.ca_cert_pem())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;
    use color_eyre::eyre::Result;
    use predicates::prelude::*;
    use rcgen::{CertificateParams, DnType};

    fn enrollment(name: &str, with_key: bool) -> Result<Enrollment> {
        let key = PrivateKey::generate()?;
        let mut params = CertificateParams::new(Vec::<String>::new())?;
        params.distinguished_name.push(DnType::CommonName, name);
        let cert = params.self_signed(&key.key_pair()?)?;
        Ok(Enrollment::new(
            name,
            cert.pem(),
            "-----BEGIN CERTIFICATE-----\nroot\n-----END CERTIFICATE-----\n",
            with_key.then_some(key),
        ))
    }

    #[test]
    fn materialize_should_lay_out_an_admin_store() -> Result<()> {
        let tmp = assert_fs::TempDir::new()?;
        let msp = tmp.child("admin/msp");
        let store = TrustStore::new(msp.path());
        let admin = enrollment("admin-owkin", true)?;

        store.materialize(&admin, true)?;

        msp.child("signcerts/cert.pem")
            .assert(predicate::str::contains("BEGIN CERTIFICATE"));
        msp.child("keystore/key.pem")
            .assert(predicate::str::contains("BEGIN PRIVATE KEY"));
        msp.child("cacerts/ca.pem").assert(predicate::str::contains("root"));
        msp.child("admincerts/cert.pem")
            .assert(admin.cert_pem().to_string());
        assert!(store.exists());
        Ok(())
    }

    #[test]
    fn enrollment_without_key_should_leave_the_keystore_alone() -> Result<()> {
        let tmp = assert_fs::TempDir::new()?;
        let store = TrustStore::new(tmp.child("peer1/msp").path());
        store.materialize(&enrollment("peer1", false)?, false)?;

        tmp.child("peer1/msp/keystore").assert(predicate::path::missing());
        tmp.child("peer1/msp/admincerts").assert(predicate::path::missing());
        Ok(())
    }

    #[test]
    fn materializing_twice_should_be_safe() -> Result<()> {
        let tmp = assert_fs::TempDir::new()?;
        let store = TrustStore::new(tmp.child("msp").path());
        let admin = enrollment("admin-owkin", true)?;

        store.materialize(&admin, true)?;
        store.materialize(&admin, true)?;
        assert!(!write_if_changed(&store.signcert_path(), admin.cert_pem())?);
        assert_eq!(store.signcert_pem()?, admin.cert_pem());
        Ok(())
    }

    #[test]
    fn complete_setup_should_alias_tls_roots_and_purge_intermediates() -> Result<()> {
        let tmp = assert_fs::TempDir::new()?;
        let msp = tmp.child("msp");
        let store = TrustStore::new(msp.path());
        store.materialize(&enrollment("peer1", true)?, false)?;
        msp.child("intermediatecerts/old-ica.pem").write_str("stale")?;

        store.complete_setup()?;
        store.complete_setup()?;

        msp.child("tlscacerts/ca.pem").assert(predicate::str::contains("root"));
        msp.child("intermediatecerts/old-ica.pem")
            .assert(predicate::path::missing());
        assert_eq!(store.tls_cacert_pems()?.len(), 1);
        Ok(())
    }

    #[test]
    fn complete_setup_should_keep_existing_tls_roots() -> Result<()> {
        let tmp = assert_fs::TempDir::new()?;
        let msp = tmp.child("msp");
        let store = TrustStore::new(msp.path());
        store.materialize(&enrollment("peer1", true)?, false)?;
        msp.child("tlscacerts/tls-ca.pem").write_str("tls root")?;

        store.complete_setup()?;

        msp.child("tlscacerts/ca.pem").assert(predicate::path::missing());
        Ok(())
    }

    #[test]
    fn admin_certs_should_be_read_back_in_name_order() -> Result<()> {
        let tmp = assert_fs::TempDir::new()?;
        let store = TrustStore::new(tmp.child("msp").path());
        store.install_admin_cert("b-admin", "second")?;
        store.install_admin_cert("a-admin", "first")?;

        assert_eq!(store.admin_cert_pems()?, vec!["first", "second"]);
        tmp.child("msp/admincerts/a-admin-cert.pem")
            .assert("first");
        Ok(())
    }

    #[test]
    fn signing_identity_should_require_a_key() -> Result<()> {
        let tmp = assert_fs::TempDir::new()?;
        let store = TrustStore::new(tmp.child("msp").path());
        store.materialize(&enrollment("peer1", false)?, false)?;

        let result = store.signing_identity("owkinMSP");
        assert!(matches!(
            result,
            Err(Error::MissingTrustMaterial(_, KEYSTORE_DIR))
        ));
        Ok(())
    }
}
