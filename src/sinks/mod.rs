pub mod sink_file;
