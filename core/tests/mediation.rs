/*
 * mediation.rs
 * Copyright (C) 2026 Conduit Contributors
 *
 * Integration test for the mediation engine: drives the process-wide registry the way the FFI
 * layer does, end to end, against the built-in test pipeline.
 *
 * Run with:
 *   cargo test -p conduit_core --test mediation
 */

use conduit_core::registry::registry;

fn handler_id(name: &str) -> String {
    format!("mediation-test-{}", name)
}

#[test]
fn pass_through_request_yields_exactly_done() {
    let id = handler_id("pass");
    let reg = registry();
    reg.create_handler(&id, "urn:test-handler").unwrap();
    let req_id = reg.create_request(&id);
    assert_ne!(req_id, 0);

    reg.begin_request(req_id, "GET /pass HTTP/1.1\r\n").unwrap();
    assert_eq!(reg.poll_request(req_id, true).unwrap(), "DONE");
    assert_eq!(reg.poll_request(req_id, false).unwrap(), "");

    reg.free_request(req_id);
    reg.destroy_handler(&id);
}

#[test]
fn returnbody_switch_allocates_a_readable_chunk() {
    let id = handler_id("returnbody");
    let reg = registry();
    reg.create_handler(&id, "urn:test-handler").unwrap();
    let req_id = reg.create_request(&id);

    reg.begin_request(req_id, "GET /returnbody HTTP/1.1\r\n").unwrap();
    assert_eq!(reg.poll_request(req_id, true).unwrap(), "SWCH200");
    let wbod = reg.poll_request(req_id, true).unwrap();
    let chunk_id = u32::from_str_radix(&wbod[4..], 16).unwrap();

    let mut len: usize = 0;
    let ptr = reg.chunks().get(chunk_id).map(|(p, l)| {
        len = l;
        p
    });
    let bytes = unsafe { std::slice::from_raw_parts(ptr.unwrap(), len) };
    assert_eq!(bytes, b"Hello! I am the server!");
    reg.chunks().release(chunk_id);

    assert_eq!(reg.poll_request(req_id, true).unwrap(), "DONE");
    reg.free_request(req_id);
    reg.destroy_handler(&id);
}

#[test]
fn request_body_round_trips_through_bounded_channel() {
    use bytes::Bytes;

    let id = handler_id("readbody");
    let reg = registry();
    reg.create_handler(&id, "urn:test-handler").unwrap();
    let req_id = reg.create_request(&id);

    reg.begin_request(req_id, "POST /readbody HTTP/1.1\r\nContent-Length: 5\r\n")
        .unwrap();
    assert_eq!(reg.poll_request(req_id, true).unwrap(), "RBOD");
    reg.send_request_body_chunk(req_id, Bytes::from_static(b"Hello"), true)
        .unwrap();
    assert_eq!(reg.poll_request(req_id, true).unwrap(), "DONE");

    reg.free_request(req_id);
    reg.destroy_handler(&id);
}

#[test]
fn response_stage_routes_on_the_originating_request_uri() {
    let id = handler_id("transformbody");
    let reg = registry();
    reg.create_handler(&id, "urn:test-handler").unwrap();
    let req_id = reg.create_request(&id);
    reg.begin_request(req_id, "GET /transformbody HTTP/1.1\r\n").unwrap();
    assert_eq!(reg.poll_request(req_id, true).unwrap(), "DONE");

    let resp_id = reg.create_response(&id);
    reg.begin_response(resp_id, req_id, 200, "").unwrap();
    let wbod = reg.poll_response(resp_id, true).unwrap();
    let chunk_id = u32::from_str_radix(&wbod[4..], 16).unwrap();
    let mut len: usize = 0;
    let ptr = reg.chunks().get(chunk_id).map(|(p, l)| {
        len = l;
        p
    });
    let bytes = unsafe { std::slice::from_raw_parts(ptr.unwrap(), len) };
    assert_eq!(bytes, b"We have transformed the response!");
    reg.chunks().release(chunk_id);
    assert_eq!(reg.poll_response(resp_id, true).unwrap(), "DONE");

    reg.free_request(req_id);
    reg.free_response(resp_id);
    reg.destroy_handler(&id);
}

#[test]
fn unregistered_handler_name_is_rejected() {
    let reg = registry();
    let err = reg
        .create_handler(&handler_id("bad-urn"), "urn:not-a-real-handler")
        .unwrap_err();
    assert!(err.to_string().contains("not-a-real-handler"));
}

#[test]
fn concurrent_requests_against_one_handler_get_distinct_ids() {
    use std::collections::HashSet;
    use std::thread;

    let id = handler_id("concurrency");
    let reg = registry();
    reg.create_handler(&id, "urn:test-handler").unwrap();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let id = id.clone();
            thread::spawn(move || {
                let reg = registry();
                (0..25).map(|_| reg.create_request(&id)).collect::<Vec<_>>()
            })
        })
        .collect();

    let mut ids = HashSet::new();
    for h in handles {
        for req_id in h.join().unwrap() {
            assert_ne!(req_id, 0);
            assert!(ids.insert(req_id));
        }
    }
    for req_id in ids {
        reg.free_request(req_id);
    }
    reg.destroy_handler(&id);
}
