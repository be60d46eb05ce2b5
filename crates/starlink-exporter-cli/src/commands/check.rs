use std::sync::Arc;

use starlink_exporter_core::DeviceIdentity;

use super::FeedArgs;

/// Poll once and print the record. Returns the poll's exit code.
pub fn run(feed: &FeedArgs, json: bool) -> i32 {
    let mut producer = match super::make_producer(feed, Arc::new(DeviceIdentity::new())) {
        Ok(p) => p,
        Err(e) => {
            log::error!("{e}");
            return 1;
        }
    };

    let (record, status) = producer.produce(true);
    producer.release();

    if json {
        let out = serde_json::json!({
            "status": status.to_string(),
            "record": record.to_json(),
        });
        match serde_json::to_string_pretty(&out) {
            Ok(s) => println!("{s}"),
            Err(e) => {
                log::error!("{e}");
                return 1;
            }
        }
        return status.code();
    }

    println!("Device:  {}", record.device_id());
    println!("Status:  {status}");
    println!("Kind:    {:?}", record.kind());
    println!();
    println!("{:<36} {:>20}  Description", "Field", "Value");
    println!("{}", "-".repeat(80));
    for (name, field) in record.fields() {
        println!("{:<36} {:>20}  {}", name, field.value.to_string(), field.description);
    }
    status.code()
}
