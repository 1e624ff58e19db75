//! Shared nodes and cycles survive a round trip.
//!
//! Run with: cargo run --example shared_graph

use freezedry::{from_bytes, to_bytes, value, Value};
use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    let address = value!({ "city": "Lisbon", "zip": "1100" });
    let alice = value!({ "name": "Alice", "home": (address.clone()) });
    let bob = value!({ "name": "Bob", "home": (address.clone()) });

    // alice.friend -> bob, bob.friend -> alice
    if let (Some(a), Some(b)) = (alice.as_object(), bob.as_object()) {
        a.borrow_mut().insert("friend", bob.clone());
        b.borrow_mut().insert("friend", alice.clone());
    }

    let people = Value::array(vec![alice, bob]);
    let bytes = to_bytes(&people)?;
    println!("Encoded graph: {} bytes", bytes.len());

    let back = from_bytes(&bytes)?;
    println!("Decoded: {:?}\n", back);

    let alice = back.get_index(0).ok_or("missing alice")?;
    let bob = back.get_index(1).ok_or("missing bob")?;
    let alice_home = alice.get("home").ok_or("missing home")?;
    let bob_home = bob.get("home").ok_or("missing home")?;
    assert!(Value::ptr_eq(&alice_home, &bob_home));
    println!("✓ Both people still share one address");

    let alices_friend = alice.get("friend").ok_or("missing friend")?;
    let back_to_alice = alices_friend.get("friend").ok_or("missing friend")?;
    assert!(Value::ptr_eq(&alices_friend, &bob));
    assert!(Value::ptr_eq(&back_to_alice, &alice));
    println!("✓ The friendship cycle points at the decoded objects");

    Ok(())
}
