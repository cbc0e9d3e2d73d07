//! Connection Manager Tests

use std::sync::Arc;

use barbershop::network::{ConnectionManager, Endpoint, Transport};

#[test]
fn test_same_endpoint_shares_connection() {
    let manager = ConnectionManager::default();
    let endpoint = Endpoint::new("localhost", 8002);

    let a = manager.get_connection(&endpoint);
    let b = manager.get_connection(&endpoint);

    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(manager.len(), 1);
}

#[test]
fn test_distinct_endpoints_get_distinct_connections() {
    let manager = ConnectionManager::default();

    let a = manager.get_connection(&Endpoint::new("localhost", 8002));
    let b = manager.get_connection(&Endpoint::new("localhost", 8003));
    let c = manager.get_connection(&Endpoint::new("127.0.0.1", 8002));

    assert!(!Arc::ptr_eq(&a, &b));
    assert!(!Arc::ptr_eq(&a, &c));
    assert_eq!(manager.len(), 3);
    assert_eq!(manager.connections().len(), 3);
}

#[test]
fn test_connections_start_disconnected() {
    let manager = ConnectionManager::default();
    assert!(manager.is_empty());

    let conn = manager.get_connection(&Endpoint::new("localhost", 8002));
    let guard = conn.lock();
    assert!(!guard.is_connected());
    assert_eq!(guard.endpoint(), &Endpoint::new("localhost", 8002));
}

#[test]
fn test_disconnect_all_keeps_registrations() {
    let manager = ConnectionManager::default();
    manager.get_connection(&Endpoint::new("localhost", 8002));
    manager.get_connection(&Endpoint::new("localhost", 8003));

    manager.disconnect_all();

    assert_eq!(manager.len(), 2);
    assert!(manager.connections().iter().all(|c| !c.lock().is_connected()));
}
