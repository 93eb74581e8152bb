//! Demonstrates a pool transparently evicting and re-admitting handles.

use bfio::backend::file::FileBackend;
use bfio::{Handle, OpenFlags, Pool, Whence};

fn main() {
    env_logger::init();

    let dir = tempfile::tempdir().expect("create scratch dir");
    let mut pool = Pool::new(2);

    let ids: Vec<_> = (0..3)
        .map(|i| {
            let path = dir.path().join(format!("handle-{i}.bin"));
            std::fs::write(&path, format!("contents of handle {i}")).expect("seed file");
            pool.append_handle(Handle::new(Box::new(FileBackend::new(path))))
        })
        .collect();

    for &id in &ids {
        pool.open(id, OpenFlags::READ).expect("open");
        println!("opened {id:?}, physically open: {:?}", ids.iter().map(|&i| pool.is_open(i).unwrap()).collect::<Vec<_>>());
    }

    let first = ids[0];
    pool.seek(first, 0, Whence::Set).expect("seek");
    let mut buf = [0u8; 8];
    let n = pool.read(first, &mut buf).expect("read re-admits if evicted");
    println!("read {n} bytes from the first handle after re-admission");
}
