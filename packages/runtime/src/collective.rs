//! Typed collectives over a type-erased communicator.

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use zoneview_comm::{Communicator, NativeDatatype};

use crate::error::{Error, Result};
use crate::registry::{self, Element, ReduceOp};

fn decode<T: Element>(bytes: &[u8]) -> Result<T> {
    T::decode(bytes).ok_or(Error::Payload(T::TAG))
}

/// Gather one `T` from every rank of `comm` onto `root`.
pub(crate) fn gather<T: Element>(
    comm: &dyn Communicator,
    value: T,
    root: usize,
) -> Result<Option<Vec<T>>> {
    let datatype = registry::datatype(T::TAG)?;
    comm.gather(value.encode(), datatype, root)?
        .map(|parts| {
            parts
                .iter()
                .map(|p| decode::<T>(p))
                .collect::<Result<Vec<T>>>()
        })
        .transpose()
}

/// Reduce one `T` from every rank of `comm` onto `root`.
pub(crate) fn reduce<T: Element>(
    comm: &dyn Communicator,
    value: T,
    op: ReduceOp,
    root: usize,
) -> Result<Option<T>> {
    let (native_op, datatype) = registry::operation(T::TAG, op)?;
    comm.reduce(value.encode(), datatype, native_op, root)?
        .map(|bytes| decode::<T>(&bytes))
        .transpose()
}

/// Gather an arbitrary serde value from every rank onto `root`.
///
/// Values travel as JSON under the `BYTE` datatype.
pub(crate) fn gather_serialized<T>(
    comm: &dyn Communicator,
    value: &T,
    root: usize,
) -> Result<Option<Vec<T>>>
where
    T: Serialize + DeserializeOwned,
{
    let payload = Bytes::from(serde_json::to_vec(value)?);
    comm.gather(payload, NativeDatatype::BYTE, root)?
        .map(|parts| {
            parts
                .iter()
                .map(|p| serde_json::from_slice(p).map_err(Error::from))
                .collect::<Result<Vec<T>>>()
        })
        .transpose()
}
