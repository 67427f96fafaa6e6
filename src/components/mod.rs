pub mod rfid;
