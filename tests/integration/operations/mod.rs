//! Integration tests for issuer operations

mod certgen_test;
mod keygen_test;
mod login_test;
