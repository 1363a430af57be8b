//! Secure storage service contract tests
//!
//! These tests define the stable wire contract between storage clients and
//! the storage partition.

// ===== Service Identifiers =====
#[allow(dead_code)]
const CREATE_SID: u32 = 0x2000;
#[allow(dead_code)]
const GET_INFO_SID: u32 = 0x2001;
#[allow(dead_code)]
const GET_ATTRIBUTES_SID: u32 = 0x2002;
#[allow(dead_code)]
const SET_ATTRIBUTES_SID: u32 = 0x2003;
#[allow(dead_code)]
const READ_SID: u32 = 0x2004;
#[allow(dead_code)]
const WRITE_SID: u32 = 0x2005;
#[allow(dead_code)]
const DELETE_SID: u32 = 0x2006;

// ===== Contract Version =====
#[allow(dead_code)]
const STORAGE_MINOR_VERSION: u32 = 1;

// ===== Contract Tests =====
