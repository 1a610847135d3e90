use log::{LevelFilter, Log, Metadata, Record};

struct Silent;

impl Log for Silent {
    fn enabled(&self, _: &Metadata) -> bool {
        false
    }

    fn log(&self, _: &Record) {}

    fn flush(&self) {}
}

static SILENT: Silent = Silent;

#[test]
fn init_keeps_failing_while_another_logger_is_installed() {
    log::set_logger(&SILENT).unwrap();
    log::set_max_level(LevelFilter::Error);

    assert!(calib_accuracy_core::init_with_level(LevelFilter::Debug).is_err());
    assert!(calib_accuracy_core::init_with_level(LevelFilter::Trace).is_err());
    assert_eq!(log::max_level(), LevelFilter::Error);
}
