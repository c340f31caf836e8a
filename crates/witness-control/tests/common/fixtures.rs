//! Test fixtures for witness-control integration tests.

use p256::elliptic_curve::sec1::ToEncodedPoint;
use witness_control::config::ProvisioningConfig;
use witness_control::{FixedConfig, RetryPolicy, TenantWitnessConfig};
use witness_ledger::Address;

/// A valid base58 ledger address derived from a repeated byte.
pub fn address(n: u8) -> String {
    Address::from_hash([n; 20]).to_base58()
}

/// A compressed P-256 public key derived from a repeated secret byte, hex
/// encoded. `n` must be non-zero.
pub fn public_key(n: u8) -> String {
    let secret = p256::SecretKey::from_slice(&[n; 32]).unwrap();
    hex::encode(secret.public_key().to_encoded_point(true).as_bytes())
}

/// Operator settings with every field populated.
pub fn complete_fixed() -> FixedConfig {
    FixedConfig {
        wallet_name: "wallet.dat".to_owned(),
        ledger_node: "http://127.0.0.1:20336".to_owned(),
        signer_address: address(1),
        server_port: 8080,
        gas_price: 500,
        cache_time: 60,
        batch_num: 100,
        try_chain_interval: 3,
        send_tx_interval: 5,
        send_tx_size: 10,
        batch_add_sleep_time: 1,
        contract_hex_addr: String::new(),
        authorize: vec![address(2)],
    }
}

/// Tenant settings authorizing one new identity and one the operator
/// already lists.
pub fn tenant() -> TenantWitnessConfig {
    TenantWitnessConfig {
        owner: address(3),
        authorized: vec![address(4), address(2)],
    }
}

/// Retry policies with millisecond intervals and small ceilings.
pub fn fast_tuning() -> ProvisioningConfig {
    ProvisioningConfig {
        collision_check: RetryPolicy::new(1, 3),
        deploy_visibility: RetryPolicy::new(1, 5),
        reverify: RetryPolicy::new(1, 3),
        init_submit: RetryPolicy::new(1, 4),
        ..ProvisioningConfig::default()
    }
}
