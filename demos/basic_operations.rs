use bytes::Bytes;
use fs_kv::{db::Store, errors::Errors, option::Options};

fn main() {
  env_logger::init();

  let opts = Options::default();
  let store = Store::open(opts).expect("failed to open store");

  let res1 = store.set("name", Bytes::from("fs-kv"));
  assert!(res1.is_ok());
  let res2 = store.get("name");
  assert!(res2.is_ok());
  let val = res2.ok().unwrap();
  println!("val = {:?}", String::from_utf8(val.to_vec()));

  let users = store.get_bucket("users").expect("failed to open bucket");
  users.set("alice", Bytes::from("admin")).expect("failed to set");
  users.set("bob", Bytes::from("guest")).expect("failed to set");

  store
    .scan("", |key, value| {
      println!("{} = {:?}", key, value);
      true
    })
    .expect("failed to scan");

  let res3 = store.remove(&["name"]);
  assert!(res3.is_ok());
  match store.get("name") {
    Err(Errors::KeyNotFound) => println!("name removed"),
    other => println!("unexpected: {:?}", other),
  }

  users.remove(&[]).expect("failed to remove bucket");
}
