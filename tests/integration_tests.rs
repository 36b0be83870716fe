//! Integration tests for thread-ledger

use thread_ledger::conversions::{bytes_to_hex, hash160, sha256};
use thread_ledger::error::{OutputError, TransactionError};
use thread_ledger::*;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn p2pkh_stack(signature: Vec<u8>, address: &Address) -> Vec<StackValue> {
    vec![
        StackValue::Bytes(signature),
        StackValue::Bytes(address.public_key().to_vec()),
    ]
}

#[test]
fn test_value_output_layout() {
    let output = Output::with_value(16, Script::default()).unwrap();
    assert_eq!(bytes_to_hex(&output.serialize().unwrap()), "000000100000");
}

#[test]
fn test_sha256_asset_layout() {
    let asset = sha256(b"some document");
    let output = Output::with_asset(OutputType::Sha256Asset, &asset, Script::default()).unwrap();
    assert_eq!(
        bytes_to_hex(&output.serialize().unwrap()),
        format!("80000000{}0000", bytes_to_hex(&asset))
    );
}

#[test]
fn test_identity_root_reserializes() {
    let owner = Address::generate();
    let script = Script::pay_to_public_key_hash(&owner.public_key_hash());
    let serialized_script = script.serialize().unwrap();

    let output = Output::identity_root(script).unwrap();
    assert_eq!(output.root(), Some(hash160(&serialized_script).as_slice()));

    let bytes = output.serialize().unwrap();
    let (decoded, consumed) = Output::deserialize(&bytes).unwrap();
    assert_eq!(consumed, bytes.len());
    assert_eq!(decoded.serialize().unwrap(), bytes);
}

#[test]
fn test_p2pkh_against_saved_transaction() {
    init_tracing();
    let mut store = MemoryStore::new();
    let owner = Address::generate();
    let imposter = Address::generate();

    let mut tx = Transaction::new(vec![], vec![Output::with_value(10, Script::default()).unwrap()]);
    tx.validate().unwrap();
    let uid = tx.save(&mut store).unwrap();
    let script = Script::pay_to_public_key_hash(&owner.public_key_hash());

    let mut vm = VirtualMachine::for_transaction(&tx, 0).with_stack(p2pkh_stack(owner.sign(&uid).unwrap(), &owner));
    assert!(script.run(&mut vm).unwrap());
    assert!(vm.is_valid());

    // signature from another key, same public key
    let mut vm =
        VirtualMachine::for_transaction(&tx, 0).with_stack(p2pkh_stack(imposter.sign(&uid).unwrap(), &owner));
    assert!(!script.run(&mut vm).unwrap());

    // public key that does not hash to the literal
    let mut vm =
        VirtualMachine::for_transaction(&tx, 0).with_stack(p2pkh_stack(imposter.sign(&uid).unwrap(), &imposter));
    assert!(!script.run(&mut vm).unwrap());
}

#[test]
fn test_checksig_on_unsaved_transaction() {
    let owner = Address::generate();
    let tx = Transaction::new(vec![], vec![Output::with_value(10, Script::default()).unwrap()]);
    let script = Script::pay_to_public_key_hash(&owner.public_key_hash());
    let signature = owner.sign(b"anything").unwrap();

    let mut vm = VirtualMachine::for_transaction(&tx, 0).with_stack(p2pkh_stack(signature, &owner));
    assert!(!script.run(&mut vm).unwrap());
}

#[test]
fn test_empty_transaction_is_invalid() {
    let mut tx = Transaction::default();
    assert_eq!(bytes_to_hex(&tx.serialize().unwrap()), "00000000");
    assert_eq!(tx.validate(), Err(TransactionError::MissingOutput));
    assert_eq!(tx.is_valid(), Ok(false));
}

#[test]
fn test_mixed_outputs_validate() {
    let mut tx = Transaction::new(
        vec![],
        vec![
            Output::with_value(1, Script::default()).unwrap(),
            Output::identity_root(Script::default()).unwrap(),
        ],
    );
    assert!(tx.validate().is_ok());

    assert_eq!(
        Output::with_value(0, Script::default()),
        Err(OutputError::MissingValue)
    );
}

#[test]
fn test_identity_update_chain() {
    init_tracing();
    let mut ledger = Ledger::new(MemoryStore::new());
    let owner = Address::generate();
    let lock = Script::pay_to_public_key_hash(&owner.public_key_hash());

    let root_output = Output::identity_root(lock.clone()).unwrap();
    let root_id = root_output.root().unwrap().to_vec();
    let mut genesis = Transaction::new(vec![], vec![root_output]);
    let genesis_uid = ledger.publish(&mut genesis).unwrap();

    // first head spends the root
    let signature = owner.sign(&genesis_uid).unwrap();
    let unlock = Script::new(vec![signature.into(), owner.public_key().to_vec().into()]);
    let head = Output::identity_head(&root_id, lock.clone()).unwrap();
    let first_asset = head.asset().unwrap().to_vec();
    let mut update = Transaction::new(vec![Input::new(genesis_uid.to_vec(), 0, unlock)], vec![head]);
    assert!(ledger.verify_input(&update, 0).unwrap());
    let update_uid = ledger.publish(&mut update).unwrap();

    // second head, same root and script, same asset
    let signature = owner.sign(&update_uid).unwrap();
    let unlock = Script::new(vec![signature.into(), owner.public_key().to_vec().into()]);
    let head = Output::identity_head(&root_id, lock).unwrap();
    assert_eq!(head.asset(), Some(first_asset.as_slice()));
    let mut second = Transaction::new(vec![Input::new(update_uid.to_vec(), 0, unlock)], vec![head]);
    assert!(ledger.verify_input(&second, 0).unwrap());
    let second_uid = ledger.publish(&mut second).unwrap();

    let unspent = ledger.unspent_outputs().unwrap();
    assert_eq!(unspent.len(), 1);
    assert_eq!(unspent[0].owning_transaction_id(), Some(&second_uid));
    assert_eq!(unspent[0].root(), Some(root_id.as_slice()));

    let genesis = ledger.transaction(&genesis_uid).unwrap().unwrap();
    assert_eq!(genesis.released_outputs().get(&0), Some(&update_uid));
}
