//! Mock versions of the item traits.
use chunk_batch::core::item::{ItemReader, ItemReaderResult, ItemWriter, ItemWriterResult};
use mockall::mock;

mock! {
    pub Writer {}
    impl ItemWriter<i32> for Writer {
        fn write(&self, items: &[i32]) -> ItemWriterResult;
        fn open(&self) -> ItemWriterResult;
        fn close(&self) -> ItemWriterResult;
    }
}

mock! {
    pub Reader {}
    impl ItemReader<i32> for Reader {
        fn read(&self) -> ItemReaderResult<i32>;
    }
}

impl MockWriter {
    /// A writer expecting `open` and `close` once each.
    pub fn opened() -> Self {
        let mut writer = MockWriter::new();
        writer.expect_open().times(1).returning(|| Ok(()));
        writer.expect_close().times(1).returning(|| Ok(()));
        writer
    }
}
