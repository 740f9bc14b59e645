//! Handler-level tests driven with in-memory request bodies
