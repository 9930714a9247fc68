pub mod menu_reader;
