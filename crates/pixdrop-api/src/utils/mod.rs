pub mod ip_extraction;
