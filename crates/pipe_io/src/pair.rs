use std::io;

use crate::device::PipeDevice;

/// Creates an anonymous pipe and wraps both ends.
///
/// Returns `(read_end, write_end)`: bytes written to the second device are
/// read from the first.
pub fn make_pair_of_connected_pipes() -> io::Result<(PipeDevice, PipeDevice)> {
    let (reader, writer) = io::pipe()?;
    Ok((
        PipeDevice::from_pipe_reader(reader),
        PipeDevice::from_pipe_writer(writer),
    ))
}
